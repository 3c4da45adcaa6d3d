use std::{env, thread};

use crate::Error;

/// The environment variable overriding the default worker thread count.
pub const WORKER_THREADS_VAR: &str = "DTOGEN_WORKER_THREADS";

/// Gets the number of worker threads to use by default.
///
/// Honors [`WORKER_THREADS_VAR`] when set and falls back to
/// [`thread::available_parallelism`] otherwise.
pub fn available_threads() -> Result<usize, Error> {
    match env::var(WORKER_THREADS_VAR) {
        Ok(value) => parse_threads(&value),

        Err(_) => Ok(thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1)),
    }
}

fn parse_threads(value: &str) -> Result<usize, Error> {
    match value.trim().parse() {
        Ok(0) | Err(_) => Err(Error::BadConfiguration),
        Ok(n) => Ok(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_natural_numbers() {
        assert_eq!(parse_threads("4").unwrap(), 4);
        assert_eq!(parse_threads(" 12\n").unwrap(), 12);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(parse_threads("0"), Err(Error::BadConfiguration)));
        assert!(matches!(parse_threads("-3"), Err(Error::BadConfiguration)));
        assert!(matches!(parse_threads("many"), Err(Error::BadConfiguration)));
    }
}
