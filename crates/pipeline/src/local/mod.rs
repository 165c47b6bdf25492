//! Collaborator implementations shipped with the workspace.

pub mod memory;
pub mod objects;
pub mod packages;
pub mod processors;
pub mod records;

pub use memory::{MemoryObjectStore, MemoryRecordStore};
pub use objects::FsObjectStore;
pub use packages::FsPackageGenerator;
pub use processors::TracingProcessor;
pub use records::PgRecordStore;
