//! Error types for the diagnostics core.
//!
//! Per-unit errors (`ScaleError`, `CodecError`) are caught by the batch
//! drivers and recorded in the run summary. `StoreError` and report-writing
//! failures are fatal and propagate out of a run as [`DiagError`].

use crate::data::model::PrimitiveType;

/// Scale classification could not produce a verdict.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScaleError {
    /// No sample vectors were supplied for the experiment.
    #[error("no sample vectors supplied")]
    EmptyInput,

    /// Every pooled value was missing.
    #[error("no valid (non-missing) values among {pooled} pooled values")]
    NoValidData {
        /// Number of values pooled before excluding missing entries
        pooled: usize,
    },
}

/// A byte payload could not be decoded at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Payload ended inside a length prefix or a string body.
    #[error(
        "payload truncated at byte {offset}: needed {needed} more bytes, {available} available"
    )]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Payload length is not a whole number of fixed-width elements.
    #[error("payload of {len} bytes is not a multiple of the {width}-byte {representation} width")]
    Misaligned {
        len: usize,
        width: usize,
        representation: PrimitiveType,
    },

    /// A string element is not valid UTF-8.
    #[error("string element {index} is not valid UTF-8")]
    InvalidUtf8 { index: usize },

    /// A CHAR element is a lone UTF-16 surrogate.
    #[error("char element {index} has invalid code unit {unit:#06x}")]
    InvalidChar { index: usize, unit: u16 },
}

/// Elements cannot be written as a payload of the requested representation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// An element's kind differs from the payload's representation.
    #[error("element {index} is {found}, expected {expected}")]
    KindMismatch {
        index: usize,
        expected: PrimitiveType,
        found: PrimitiveType,
    },

    /// A CHAR element needs more than one UTF-16 code unit.
    #[error("char element {index} ({ch:?}) does not fit one UTF-16 code unit")]
    CharOutsideBmp { index: usize, ch: char },

    /// A string element is too long for its length prefix.
    #[error("string element {index} is {len} bytes, longer than a u32 length prefix allows")]
    Oversized { index: usize, len: usize },
}

/// Failure checking one vector: its payload could not be read, or the
/// repaired payload could not be written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Failure in the storage collaborator. Propagated unmodified.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Write-back named a vector the store does not hold.
    #[error("vector {0} not found in store")]
    UnknownVector(i64),

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other backend failure, with its description.
    #[error("store backend failed: {0}")]
    Backend(String),
}

/// Fatal errors that abort a whole run.
#[derive(Debug, thiserror::Error)]
pub enum DiagError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Writing the scale report failed (e.g. the disk is full).
    #[error("writing report failed: {0}")]
    Report(#[from] csv::Error),

    #[error("writing report failed: {0}")]
    Io(#[from] std::io::Error),
}
