pub mod commit;
pub mod mapping;
pub mod records;
pub mod sessions;
pub mod upload;
pub mod validation;
