//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod file_repo;
pub mod job_repo;
pub mod manifest_repo;
pub mod mapping_repo;
pub mod record_repo;
pub mod row_repo;
pub mod session_repo;

pub use file_repo::FileRepo;
pub use job_repo::JobRepo;
pub use manifest_repo::ManifestRepo;
pub use mapping_repo::{MappingRepo, ProfileRepo};
pub use record_repo::{DigitalObjectRepo, RecordRepo};
pub use row_repo::{IssueRepo, RowRepo};
pub use session_repo::SessionRepo;
