//! Synthetic offline responses.
//!
//! Everything here is pure: no network or cache access, and the same
//! configuration always yields the same bytes.

use regex::Regex;
use serde_json::json;
use shellcache_core::{AppConfig, Destination, Request, Response};
use std::sync::LazyLock;

static IMAGE_EXTENSION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\.(svg|jpe?g|png|gif|webp|ico)(\?|$)").ok());

/// Which placeholder image to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// 200×200 "Offline" tile for missing static images.
    Static,
    /// 60×60 "No Image" tile for degraded cross-origin images.
    Passthrough,
}

/// Localizable texts embedded in the generated responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackContent {
    pub app_name: String,
    pub offline_message: String,
    pub offline_heading: String,
    pub retry_label: String,
}

impl FallbackContent {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            app_name: config.app_name.clone(),
            offline_message: config.offline_message.clone(),
            offline_heading: config.offline_heading.clone(),
            retry_label: config.retry_label.clone(),
        }
    }

    /// `503` JSON body `{"error": ..., "offline": true}`.
    pub fn offline_json(&self) -> Response {
        let body = json!({
            "error": self.offline_message,
            "offline": true,
        });
        Response::synthetic(503, "application/json", body.to_string())
    }

    /// Placeholder SVG, always status 200.
    pub fn placeholder_image(&self, kind: Placeholder) -> Response {
        let svg = match kind {
            Placeholder::Static => svg_tile(200, 200, "#f0f0f0", "#999", 14, "Offline"),
            Placeholder::Passthrough => svg_tile(60, 60, "#f8f9fa", "#6c757d", 10, "No Image"),
        };
        Response::synthetic(200, "image/svg+xml", svg)
    }

    /// Minimal offline page with a reload control, status 200.
    pub fn offline_page(&self) -> Response {
        let html = format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} - {app}</title>
<style>
body {{ font-family: system-ui, sans-serif; text-align: center; padding: 3rem 1rem; color: #333; }}
button {{ margin-top: 1.5rem; padding: .6rem 1.4rem; font-size: 1rem; cursor: pointer; }}
</style>
</head>
<body>
<h1>{title}</h1>
<p>{message}</p>
<button type="button" onclick="location.reload()">{retry}</button>
</body>
</html>
"#,
            title = escape_html(&self.offline_heading),
            app = escape_html(&self.app_name),
            message = escape_html(&self.offline_message),
            retry = escape_html(&self.retry_label),
        );
        Response::synthetic(200, "text/html; charset=utf-8", html)
    }
}

impl Default for FallbackContent {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Heuristic: the request's destination is an image, or its URL looks like one.
pub fn looks_like_image(request: &Request) -> bool {
    if request.destination == Destination::Image {
        return true;
    }
    let url = request.url.as_str();
    if url.to_ascii_lowercase().contains("image") {
        return true;
    }
    IMAGE_EXTENSION.as_ref().is_some_and(|re| re.is_match(url))
}

fn svg_tile(width: u32, height: u32, fill: &str, ink: &str, font_size: u32, label: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}"><rect width="{width}" height="{height}" fill="{fill}"/><text x="50%" y="50%" font-family="sans-serif" font-size="{font_size}" fill="{ink}" text-anchor="middle" dominant-baseline="middle">{label}</text></svg>"#
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
