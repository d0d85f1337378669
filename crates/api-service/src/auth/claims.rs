//! JWT claims structure.
//!
//! Contains the claims extracted from validated access tokens. Identifying
//! claims (`name`, `sub`, `oid`) are redacted in Debug output to keep them
//! out of logs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The `aud` claim, which may be a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// The primary audience: the string itself, or the first list entry.
    pub fn primary(&self) -> &str {
        match self {
            Audience::Single(aud) => aud,
            Audience::Multiple(list) => list.first().map(String::as_str).unwrap_or_default(),
        }
    }
}

/// Claims of a validated access token.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Display name of the signed-in user - redacted in Debug output.
    #[serde(default)]
    pub name: String,

    /// Subject - redacted in Debug output.
    #[serde(default)]
    pub sub: String,

    /// Directory object id of the user - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,

    /// Issuer.
    pub iss: String,

    /// Audience.
    pub aud: Audience,

    /// Space-separated delegated scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scp: Option<String>,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Not-before timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("name", &"[REDACTED]")
            .field("sub", &"[REDACTED]")
            .field("oid", &self.oid.as_ref().map(|_| "[REDACTED]"))
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("scp", &self.scp)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .finish()
    }
}

impl Claims {
    /// The raw scope claim, empty when the token carries none.
    pub fn scope(&self) -> &str {
        self.scp.as_deref().unwrap_or_default()
    }

    /// Whether the token grants at least one of `required` (always true when empty).
    pub fn has_any_scope(&self, required: &BTreeSet<String>) -> bool {
        common::jwt::has_any_scope(self.scope(), required)
    }
}
