//! # Unmarshal Context
//!
//! The direction of traffic being unmarshalled. It decides which
//! properties are invisible (`readOnly` in requests, `writeOnly` in
//! responses) and which access mode the structural validator enforces.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction of the traffic a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmarshalContext {
    /// Client to server. `readOnly` properties are skipped.
    Request,
    /// Server to client. `writeOnly` properties are skipped.
    Response,
}

/// Property access rule enforced by the structural validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// `readOnly` properties may not appear and are never required.
    Write,
    /// `writeOnly` properties may not appear and are never required.
    Read,
}

impl UnmarshalContext {
    /// The validator access mode this context activates.
    pub fn access_mode(self) -> AccessMode {
        match self {
            Self::Request => AccessMode::Write,
            Self::Response => AccessMode::Read,
        }
    }

    /// Whether a property with the given flags is invisible in this context.
    pub fn hides(self, read_only: bool, write_only: bool) -> bool {
        match self {
            Self::Request => read_only,
            Self::Response => write_only,
        }
    }
}

impl fmt::Display for UnmarshalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("request"),
            Self::Response => f.write_str("response"),
        }
    }
}
