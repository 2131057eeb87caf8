//! Domain model for busy-threads
//!
//! - `types`: process and thread ids, samples, dumps, stack blocks
//! - `errors`: one error enum per pipeline stage

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{
    DumpRecord, FormatVariant, Identity, Pid, RankedBatch, StackBlock, ThreadLimit, ThreadSample,
    Tid,
};

pub use errors::{DumpError, ExtractError, NoTargetProcess, SamplingError, SetupError};
