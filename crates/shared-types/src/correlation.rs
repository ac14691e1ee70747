//! `RequestUuid`: the key that ties a response back to its command.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Minted once per outbound command; the worker echoes it verbatim.
///
/// v7, so ids sort by mint time and read well in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestUuid(Uuid);

impl RequestUuid {
    /// The only place request ids are created.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parse the textual form found in `RequestUUID`.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for RequestUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for RequestUuid {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
