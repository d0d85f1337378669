//! Protected resource handler.
//!
//! Returns a fixed projection of the validated token's claims.

use crate::auth::Claims;
use axum::{Extension, Json};
use serde::Serialize;
use tracing::instrument;

/// Response for the `/api` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimsProjection {
    /// Display name of the caller, empty when the token has none.
    pub name: String,

    /// Token issuer.
    #[serde(rename = "issued-by")]
    pub issued_by: String,

    /// Primary audience of the token.
    #[serde(rename = "issued-for")]
    pub issued_for: String,

    /// Space-delimited delegated scopes.
    pub scope: String,
}

impl From<&Claims> for ClaimsProjection {
    fn from(claims: &Claims) -> Self {
        Self {
            name: claims.name.clone(),
            issued_by: claims.iss.clone(),
            issued_for: claims.aud.primary().to_string(),
            scope: claims.scope().to_string(),
        }
    }
}

/// Handler for GET /api
///
/// Requires valid authentication via the auth middleware.
///
/// ## Response
///
/// ```json
/// {
///   "name": "Megan Bowen",
///   "issued-by": "https://login.microsoftonline.com/{tenant}/v2.0",
///   "issued-for": "{client-id}",
///   "scope": "access_as_user"
/// }
/// ```
#[instrument(skip_all, name = "api.handlers.claims")]
pub async fn get_claims(Extension(claims): Extension<Claims>) -> Json<ClaimsProjection> {
    tracing::debug!(target: "api.handlers.claims", "Returning claims projection");

    Json(ClaimsProjection::from(&claims))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::Audience;

    fn claims(aud: Audience, name: &str, scp: Option<&str>) -> Claims {
        Claims {
            name: name.to_string(),
            sub: "subject".to_string(),
            oid: None,
            iss: "https://login.microsoftonline.com/tenant/v2.0".to_string(),
            aud,
            scp: scp.map(ToString::to_string),
            exp: 1_700_003_600,
            iat: Some(1_700_000_000),
            nbf: None,
        }
    }

    #[tokio::test]
    async fn test_projection_has_exactly_four_fields() {
        let Json(projection) = get_claims(Extension(claims(
            Audience::Single("api-client-id".to_string()),
            "Megan Bowen",
            Some("access_as_user"),
        )))
        .await;

        let json = serde_json::to_value(projection).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object.len(), 4);
        assert_eq!(json["name"], "Megan Bowen");
        assert_eq!(
            json["issued-by"],
            "https://login.microsoftonline.com/tenant/v2.0"
        );
        assert_eq!(json["issued-for"], "api-client-id");
        assert_eq!(json["scope"], "access_as_user");
    }

    #[test]
    fn test_projection_defaults() {
        let projection = ClaimsProjection::from(&claims(
            Audience::Multiple(vec!["first".to_string(), "second".to_string()]),
            "",
            None,
        ));

        assert_eq!(projection.name, "");
        assert_eq!(projection.issued_for, "first");
        assert_eq!(projection.scope, "");
    }
}
