//! Static file serving for the ParcelView frontend.
//!
//! The frontend bundle is embedded into the binary at compile time and served
//! with SPA fallback, so client-side routes resolve to `index.html`.

use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::Embed;
use std::path::Path;

/// Embedded static files from the frontend build.
///
/// Embedded from `frontend/dist`. When only the placeholder page is present
/// the API still works; the page explains how to build the real bundle.
#[derive(Embed)]
#[folder = "frontend/dist"]
#[include = "*.html"]
#[include = "*.js"]
#[include = "*.css"]
#[include = "*.json"]
#[include = "*.png"]
#[include = "*.ico"]
#[include = "*.svg"]
#[include = "*.woff2"]
#[include = "assets/*"]
#[include = "assets/**/*"]
pub struct StaticAssets;

/// Serves static files with SPA fallback.
///
/// 1. Serves the exact requested path if embedded
/// 2. Returns 404 for missing paths that look like files
/// 3. Serves `index.html` for everything else
pub async fn serve_static(request: Request) -> Response {
    let path = request.uri().path().trim_start_matches('/');

    if path.is_empty() {
        return serve_file("index.html");
    }

    if let Some(content) = StaticAssets::get(path) {
        return file_response(path, content.data.as_ref());
    }

    let looks_like_file = Path::new(path)
        .extension()
        .is_some_and(|ext| !ext.is_empty());

    if looks_like_file {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    }

    serve_file("index.html")
}

fn serve_file(path: &str) -> Response {
    match StaticAssets::get(path) {
        Some(content) => file_response(path, content.data.as_ref()),
        None => (StatusCode::NOT_FOUND, "File not found").into_response(),
    }
}

fn file_response(path: &str, content: &[u8]) -> Response {
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CACHE_CONTROL, cache_control_for_path(path))
        .body(Body::from(content.to_vec()))
        .unwrap_or_else(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create response",
            )
                .into_response()
        })
}

/// Cache policy by path.
///
/// Vite emits content-hashed files under `assets/`, so those never change.
fn cache_control_for_path(path: &str) -> &'static str {
    if path.starts_with("assets/") {
        "public, max-age=31536000, immutable"
    } else if Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
    {
        "no-cache, must-revalidate"
    } else {
        "public, max-age=3600"
    }
}

/// Returns true if a frontend bundle was embedded.
#[must_use]
pub fn has_embedded_assets() -> bool {
    StaticAssets::get("index.html").is_some()
}
