//! Per-request correlation ids (UUIDv7, time ordered).

use std::fmt;

use uuid::Uuid;

/// Header carrying the request id, in and out.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id attached to a request span and echoed to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Accept a caller-supplied id if it is short printable ASCII, else mint one.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() && v.len() <= 128 && v.chars().all(|c| c.is_ascii_graphic()) => {
                Self(v.to_string())
            }
            _ => new_request_id(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mint a fresh id.
pub fn new_request_id() -> RequestId {
    RequestId(Uuid::now_v7().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_are_uuids_and_distinct() {
        let a = new_request_id();
        let b = new_request_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn caller_ids_are_kept_when_sane() {
        assert_eq!(RequestId::from_header(Some(" abc-123 ")).as_str(), "abc-123");
    }

    #[test]
    fn bad_caller_ids_are_replaced() {
        for bad in [None, Some(""), Some("has space"), Some("é")] {
            let id = RequestId::from_header(bad);
            assert!(Uuid::parse_str(id.as_str()).is_ok(), "{bad:?}");
        }
        let long = "x".repeat(200);
        assert!(Uuid::parse_str(RequestId::from_header(Some(&long)).as_str()).is_ok());
    }
}
