//! Core types for ranking resumes against weighted skill queries.
//!
//! Candidates, queries, the embedding seam and the shared error type live
//! here; scoring lives in `cvrank-engine`.

pub mod archive;
pub mod chunking;
pub mod config;
pub mod error;
pub mod query;
pub mod similarity;
pub mod space;
pub mod traits;
pub mod types;

pub use config::TopN;
pub use error::{Error, ErrorKind, Result};
pub use query::QuerySpec;
pub use space::VectorSpace;
pub use types::{CandidateMetadata, CandidateRecord, CandidateSet};
