pub mod hr;

pub use hr::{JobCandidateStatus, JobCandidateUpdate, NewCandidate};
