use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::{self, Receiver},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use dtogen_executor::*;
use threadpool::ThreadPool;

fn init_logger() {
    let _ = simple_logger::init_with_level(log::Level::Debug);
}

#[test]
fn failing_tasks_do_not_stall_the_batch() -> Result<(), Error> {
    init_logger();

    let executor = ThreadPool::new(8);
    let barrier = ThrottledFanOutBarrier::new(20, 4)?;

    let tasks = (0..20usize).map(|i| {
        move || {
            thread::sleep(Duration::from_millis(2));
            if i % 6 == 3 {
                panic!("task {i} failed");
            }

            i
        }
    });

    let results = barrier.run_all(tasks, &executor)?;
    assert_eq!(results.len(), 20);

    for (i, result) in results.iter().enumerate() {
        match i {
            3 | 9 | 15 => assert_eq!(
                result,
                &Err(TaskFailure::Panicked(format!("task {i} failed")))
            ),
            _ => assert_eq!(result, &Ok(i)),
        }
    }

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 17);

    Ok(())
}

#[test]
fn in_flight_bound_is_soft_but_recovers() -> Result<(), Error> {
    const THREADS: usize = 8;
    const LIMIT: usize = 4;

    let executor = ThreadPool::new(THREADS);
    let barrier = ThrottledFanOutBarrier::new(40, LIMIT)?;
    assert_eq!(barrier.concurrency_limit(), LIMIT);
    assert_eq!(barrier.total_tasks(), 40);

    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..40)
        .map(|_| {
            let active = active.clone();
            let peak = peak.clone();
            move || {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
                active.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .collect();

    let results = barrier.run_all(tasks, &executor)?;

    assert!(results.iter().all(Result::is_ok));
    // Overshoot is possible, but never beyond what the executor runs.
    let peak = peak.load(Ordering::SeqCst);
    assert!((1..=THREADS).contains(&peak));
    assert_eq!(active.load(Ordering::SeqCst), 0);

    Ok(())
}

/// Runs every job on a thread of its own and only returns once the
/// task body has started, which makes the gate the only thing that
/// holds submissions back.
struct Spawner {
    submitted: AtomicUsize,
    entered: Mutex<Receiver<()>>,
}

impl Execute for Spawner {
    fn execute(&self, job: Job) -> Result<(), Error> {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        thread::spawn(job);

        let _ = self.entered.lock().unwrap().recv();
        Ok(())
    }
}

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn submitter_waits_at_the_gate() -> Result<(), Error> {
    const TASKS: usize = 6;
    const LIMIT: usize = 2;

    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Arc::new(Mutex::new(release_rx));

    let spawner = Arc::new(Spawner {
        submitted: AtomicUsize::new(0),
        entered: Mutex::new(entered_rx),
    });

    let tasks: Vec<_> = (0..TASKS)
        .map(|i| {
            let entered_tx = entered_tx.clone();
            let release_rx = release_rx.clone();
            move || {
                entered_tx.send(()).unwrap();
                release_rx.lock().unwrap().recv().unwrap();
                i
            }
        })
        .collect();

    let barrier = ThrottledFanOutBarrier::new(TASKS, LIMIT)?;
    let runner = {
        let spawner = spawner.clone();
        thread::spawn(move || barrier.run_all(tasks, &*spawner))
    };

    let submitted = || spawner.submitted.load(Ordering::SeqCst);

    wait_until("the first tasks", || submitted() == LIMIT);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(submitted(), LIMIT);

    for expected in LIMIT + 1..=TASKS {
        release_tx.send(()).unwrap();
        wait_until("the next submission", || submitted() == expected);

        thread::sleep(Duration::from_millis(20));
        assert_eq!(submitted(), expected);
    }

    for _ in 0..LIMIT {
        release_tx.send(()).unwrap();
    }

    let results = runner.join().unwrap()?;
    assert_eq!(results, (0..TASKS).map(Ok).collect::<Vec<_>>());

    Ok(())
}

#[test]
fn runs_on_a_worker_pool() -> Result<(), Error> {
    let pool = WorkerPool::new(3, true)?;
    let barrier = ThrottledFanOutBarrier::new(10, 2)?;

    let results = barrier.run_all((0..10).map(|i| move || i * i), &pool)?;
    assert_eq!(results, (0..10).map(|i| Ok(i * i)).collect::<Vec<_>>());

    pool.shutdown()
}

#[test]
fn rejected_tasks_are_abandoned() -> Result<(), Error> {
    init_logger();

    let pool = WorkerPool::new(2, false)?;
    pool.shutdown()?;

    let barrier = ThrottledFanOutBarrier::new(5, 2)?;
    let results = barrier.run_all((0..5).map(|i| move || i), &pool)?;

    assert!(results.iter().all(|r| r == &Err(TaskFailure::Abandoned)));

    Ok(())
}

#[test]
fn runs_on_the_shared_executor() -> Result<(), Error> {
    let executor = shared_executor()?;
    let barrier = ThrottledFanOutBarrier::new(16, 3)?;

    let results = barrier.run_all((0..16).map(|i| move || format!("#{i}")), executor)?;

    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result, Ok(format!("#{i}")));
    }

    Ok(())
}
