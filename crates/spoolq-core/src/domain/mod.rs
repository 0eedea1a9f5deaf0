//! Domain model (ids, envelope, filename codec).

pub mod envelope;
pub mod filename;
pub mod ids;

pub use envelope::Envelope;
pub use filename::{EXTENSION, JobFileName, SEPARATOR};
pub use ids::JobId;
