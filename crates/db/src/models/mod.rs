//! Database row structs and insert DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` struct matching the
//! table row, the `Deserialize` DTOs used for inserts, and an
//! `into_domain` conversion to the `archivist-core` type. Enumerations are
//! stored as text and JSON blobs as `JSONB`, so conversion can fail on a
//! hand-edited row; such failures surface as `CoreError::Internal`.

pub mod job;
pub mod manifest;
pub mod mapping;
pub mod record;
pub mod row;
pub mod session;
pub mod upload;

use archivist_core::error::CoreError;

/// Parse a stored text enum.
pub(crate) fn parse_column<T>(column: &str, value: &str) -> Result<T, CoreError>
where
    T: std::str::FromStr,
{
    value
        .parse()
        .map_err(|_| CoreError::Internal(format!("Invalid stored {column} '{value}'")))
}

/// Decode a stored JSONB column.
pub(crate) fn decode_json<T>(column: &str, value: serde_json::Value) -> Result<T, CoreError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(value)
        .map_err(|e| CoreError::Internal(format!("Invalid stored {column}: {e}")))
}

/// Encode a value for a JSONB column.
pub(crate) fn encode_json<T: serde::Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}
