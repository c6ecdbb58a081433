//! Diagnostics for expression-data measurement vectors.
//!
//! Two analyzers share a batch shape (per unit, continue on error,
//! summary counters):
//!
//! * [`scale`] decides whether an experiment's values are log-transformed;
//! * [`integrity`] checks encoded vectors against their sample count and
//!   strips tab artifacts from string vectors.
//!
//! [`batch`] drives both over a [`source::SampleSource`] or
//! [`source::VectorStore`].

pub mod batch;
pub mod config;
pub mod data;
pub mod error;
pub mod integrity;
pub mod report;
pub mod scale;
pub mod source;
pub mod stats;

pub use batch::{BatchSummary, IntegrityRun, ScaleRecord, ScaleRun};
pub use config::RunConfig;
pub use error::{CodecError, DecodeError, DiagError, EncodeError, ScaleError, StoreError};
pub use integrity::{CheckMode, IntegrityReport, Outcome};
pub use scale::ScaleVerdict;
