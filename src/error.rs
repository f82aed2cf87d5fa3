//! Error kinds for the nesting engine.
//!
//! Only [`NestError::EmptyInput`] aborts a run; every other variant is
//! recoverable and is absorbed into a fitness penalty or a dropped shape
//! rather than propagated as a hard failure.

use crate::nfp::NfpKey;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NestError {
    #[error("no container or shapes supplied")]
    EmptyInput,

    #[error("shape {id} simplified to fewer than 3 vertices and was dropped")]
    DegeneratePolygon { id: i64 },

    #[error("no-fit-polygon unavailable for key {key:?}")]
    NFPUnavailable { key: NfpKey },

    #[error("no feasible position for part {part_id}")]
    NoFeasiblePosition { part_id: i64 },

    #[error("run cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, NestError>;
