//! Shared response envelope for API handlers.
//!
//! Every JSON response uses a `{ "data": ... }` envelope. Use
//! [`DataResponse`] instead of ad-hoc `json!({ "data": ... })`.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
