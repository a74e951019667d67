//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, route
//! matching, and access logging. The server registers a single route,
//! GET "/", which serves the home page template.

use crate::config::AppState;
use crate::handler::page;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

/// Template served on the root route
const HOME_TEMPLATE: &str = "tictactoe.html";

/// Main entry point for HTTP request handling
///
/// Generic over the body type since no handler consumes a request body;
/// routing is a function of (method, path) alone.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_string(req.version()).to_string();
    entry.referer = header_value(&req, "referer");
    entry.user_agent = header_value(&req, "user-agent");

    let response = route_request(&req, &state).await;

    let access_log = state
        .cached_access_log
        .load(std::sync::atomic::Ordering::Relaxed);
    if access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = body_size(&response);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route request based on method and path
async fn route_request<B>(req: &Request<B>, state: &Arc<AppState>) -> Response<Full<Bytes>> {
    // 1. Only the root route is registered
    if req.uri().path() != "/" {
        return http::build_404_response();
    }

    // 2. Only GET is supported on the root route
    if let Some(resp) = check_http_method(req.method()) {
        return resp;
    }

    // 3. Reject requests advertising an oversized body
    if let Some(resp) = check_body_size(req, state.config.http.max_body_size) {
        return resp;
    }

    logger::log_headers_count(req.headers().len(), state.config.logging.show_headers);

    // 4. Serve the page
    page::serve_home(state, HOME_TEMPLATE).await
}

/// Check HTTP method and return a 405 response for anything but GET
fn check_http_method(method: &Method) -> Option<Response<Full<Bytes>>> {
    if method == Method::GET {
        None
    } else {
        logger::log_warning(&format!("Method not allowed: {method}"));
        Some(http::build_405_response())
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

fn header_value<B>(req: &Request<B>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn version_string(version: Version) -> &'static str {
    match version {
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        _ => "1.1",
    }
}

fn body_size(response: &Response<Full<Bytes>>) -> usize {
    usize::try_from(response.body().size_hint().exact().unwrap_or(0)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig, TemplateConfig,
    };
    use http_body_util::BodyExt;
    use tempfile::TempDir;

    const PAGE: &[u8] = b"<html>...</html>";

    fn test_state(dir: &TempDir, auto_reload: bool) -> Arc<AppState> {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                workers: None,
            },
            templates: TemplateConfig {
                directory: dir.path().to_string_lossy().into_owned(),
                auto_reload,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                access_log: false,
                show_headers: false,
                access_log_format: "combined".to_string(),
                access_log_file: None,
                error_log_file: None,
            },
            performance: PerformanceConfig {
                keep_alive_timeout: 75,
                read_timeout: 30,
                write_timeout: 30,
                max_connections: None,
            },
            http: HttpConfig {
                server_name: "Tokio-Hyper/1.0".to_string(),
                max_body_size: 1024,
            },
        };
        Arc::new(AppState::new(&config).expect("state"))
    }

    fn state_with_page(dir: &TempDir) -> Arc<AppState> {
        std::fs::write(dir.path().join("tictactoe.html"), PAGE).expect("write template");
        test_state(dir, true)
    }

    fn request(method: Method, uri: &str) -> Request<()> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .expect("request")
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().expect("addr")
    }

    async fn body_bytes(response: Response<Full<Bytes>>) -> Bytes {
        response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes()
    }

    #[tokio::test]
    async fn test_get_root_serves_template_verbatim() {
        let dir = TempDir::new().expect("tempdir");
        let state = state_with_page(&dir);

        let resp = handle_request(request(Method::GET, "/"), state, peer())
            .await
            .expect("infallible");
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(&body_bytes(resp).await[..], PAGE);
    }

    #[tokio::test]
    async fn test_repeated_gets_are_byte_identical() {
        let dir = TempDir::new().expect("tempdir");
        let state = state_with_page(&dir);

        let first = handle_request(request(Method::GET, "/"), Arc::clone(&state), peer())
            .await
            .expect("infallible");
        let second = handle_request(request(Method::GET, "/"), state, peer())
            .await
            .expect("infallible");
        assert_eq!(body_bytes(first).await, body_bytes(second).await);
    }

    #[tokio::test]
    async fn test_non_get_methods_on_root_are_405() {
        let dir = TempDir::new().expect("tempdir");
        let state = state_with_page(&dir);

        for method in [
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::HEAD,
            Method::OPTIONS,
        ] {
            let resp = handle_request(request(method.clone(), "/"), Arc::clone(&state), peer())
                .await
                .expect("infallible");
            assert_eq!(resp.status(), 405, "method {method} should be rejected");
            assert_eq!(resp.headers().get("allow").unwrap(), "GET");
        }
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let dir = TempDir::new().expect("tempdir");
        let state = state_with_page(&dir);

        let resp = handle_request(request(Method::GET, "/missing"), Arc::clone(&state), peer())
            .await
            .expect("infallible");
        assert_eq!(resp.status(), 404);

        // No route registered regardless of method
        let resp = handle_request(request(Method::POST, "/missing"), state, peer())
            .await
            .expect("infallible");
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_missing_template_is_500() {
        let dir = TempDir::new().expect("tempdir");
        let state = test_state(&dir, true);

        let resp = handle_request(request(Method::GET, "/"), state, peer())
            .await
            .expect("infallible");
        assert_eq!(resp.status(), 500);
    }

    #[tokio::test]
    async fn test_deleted_template_fails_next_get_with_auto_reload() {
        let dir = TempDir::new().expect("tempdir");
        let state = state_with_page(&dir);

        let resp = handle_request(request(Method::GET, "/"), Arc::clone(&state), peer())
            .await
            .expect("infallible");
        assert_eq!(resp.status(), 200);

        std::fs::remove_file(dir.path().join("tictactoe.html")).expect("delete");
        let resp = handle_request(request(Method::GET, "/"), state, peer())
            .await
            .expect("infallible");
        assert_eq!(resp.status(), 500);
    }

    #[tokio::test]
    async fn test_oversized_content_length_is_413() {
        let dir = TempDir::new().expect("tempdir");
        let state = state_with_page(&dir);

        let req = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header("content-length", "4096")
            .body(())
            .expect("request");
        let resp = handle_request(req, state, peer()).await.expect("infallible");
        assert_eq!(resp.status(), 413);
    }
}
