pub mod assembler;
pub mod http;
pub mod orchestrator;
pub mod scoring;
pub mod snapshot;
pub mod validators;

pub use assembler::ResultAssembler;
pub use orchestrator::Analyzer;
pub use snapshot::{SnapshotFetcher, SnapshotProvider};
