//! `authConfig.js` templating.
//!
//! The browser bundle reads its redirect URI and API endpoint from
//! `authConfig.js`. The file on disk carries `<APP_URL>` and `<API_URL>`
//! placeholders that are filled in on every request, so edits to the
//! template take effect without a restart.

use crate::errors::AppError;
use crate::routes::AppState;
use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::instrument;

/// Template file name inside the static directory.
pub const AUTH_CONFIG_TEMPLATE: &str = "authConfig.js";

pub const APP_URL_PLACEHOLDER: &str = "<APP_URL>";
pub const API_URL_PLACEHOLDER: &str = "<API_URL>";

/// Substitute every placeholder occurrence.
pub fn render_auth_config(template: &str, app_url: &str, api_url: &str) -> String {
    template
        .replace(APP_URL_PLACEHOLDER, app_url)
        .replace(API_URL_PLACEHOLDER, api_url)
}

/// Handler for GET /authConfig.js
///
/// Responds 404 when the template cannot be read.
#[instrument(skip_all, name = "app.auth_config")]
pub async fn auth_config(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let path = state.config.static_dir.join(AUTH_CONFIG_TEMPLATE);

    let template = tokio::fs::read_to_string(&path).await.map_err(|e| {
        tracing::warn!(
            target: "app.auth_config",
            path = %path.display(),
            error = %e,
            "Failed to read config template"
        );
        AppError::NotFound(AUTH_CONFIG_TEMPLATE.to_string())
    })?;

    let rendered = render_auth_config(&template, &state.config.app_url, &state.config.api_url);

    Ok(([(CONTENT_TYPE, "text/javascript; charset=utf-8")], rendered).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_every_occurrence() {
        let template = "a=<APP_URL>; b=<API_URL>/api; c=<APP_URL>/redirect;";

        let rendered = render_auth_config(template, "http://app", "http://api");

        assert_eq!(
            rendered,
            "a=http://app; b=http://api/api; c=http://app/redirect;"
        );
    }

    #[test]
    fn test_render_without_placeholders_is_identity() {
        let template = "const x = 1;";
        assert_eq!(render_auth_config(template, "a", "b"), template);
    }
}
