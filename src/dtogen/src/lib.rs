//! Generation of data transfer object sources from class descriptions.
//!
//! A [`DtoGenerator`] renders every [`ClassDescription`] of a batch
//! through an [`Emitter`], spreading the work across threads with the
//! machinery from [`dtogen_executor`].
//!
//! Rendering failures are isolated per class and reported through
//! [`DtoDescription::unit`] instead of failing the whole batch.

#![deny(rust_2018_idioms, rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub use dtogen_executor;

mod emitter;
pub use emitter::*;

mod error;
pub use error::Error;

mod generator;
pub use generator::{DtoDescription, DtoGenerator};

mod model;
pub use model::*;
