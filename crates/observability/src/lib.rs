//! Tracing and request correlation (shared setup).

/// Initialize process-wide tracing with the default `info` filter.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Request correlation ids.
pub mod request;

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use request::{new_request_id, RequestId, REQUEST_ID_HEADER};
