//! Template page serving module
//!
//! Renders the configured template and builds the HTTP response.

use crate::config::AppState;
use crate::http;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::sync::Arc;

/// Serve the home page template
///
/// The template is rendered with no variable bindings, so the response body
/// is the file content verbatim. A missing or unreadable template is server
/// misconfiguration and surfaces as 500, never as a partial response.
pub async fn serve_home(state: &Arc<AppState>, template: &str) -> Response<Full<Bytes>> {
    match state.templates.render(template).await {
        Ok(content) => {
            http::response::build_html_response(content, &state.config.http.server_name)
        }
        Err(e) => {
            logger::log_error(&e.to_string());
            http::build_500_response()
        }
    }
}
