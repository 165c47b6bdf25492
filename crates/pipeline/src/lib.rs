//! The ingest wizard's services.
//!
//! Each stage module exposes async operations over an [`IngestContext`]:
//! [`session`] (configure, advance, cancel), [`upload`], [`mapping`],
//! [`validate`], [`preview`], [`commit`], [`rollback`] and [`export`].
//! Persistence goes through [`store::IngestStore`]; record creation,
//! digital-object storage, packaging and content processing go through
//! the traits in [`collaborators`].

pub mod collaborators;
pub mod commit;
pub mod context;
pub mod error;
pub mod export;
pub mod local;
pub mod mapping;
pub mod preview;
pub mod rollback;
pub mod session;
pub mod source;
pub mod store;
pub mod upload;
pub mod validate;

pub use context::{IngestContext, PipelineSettings};
pub use error::{PipelineError, PipelineResult};
