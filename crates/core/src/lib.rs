pub mod commit;
pub mod digital_object;
pub mod error;
pub mod fields;
pub mod hierarchy;
pub mod mapping;
pub mod row;
pub mod session;
pub mod types;
pub mod upload;
pub mod validation;
