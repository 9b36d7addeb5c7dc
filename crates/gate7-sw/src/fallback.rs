//! Fallback synthesis for requests neither the network nor the cache could
//! answer. Content type and status are observable; the bodies are minimal.

use bytes::Bytes;
use gate7_net::Destination;
use http::StatusCode;

use crate::response::FetchResponse;

/// Inline page served to navigations when offline and no offline page is
/// cached.
pub const OFFLINE_HTML: &str = "<!DOCTYPE html><html><body><h1>Offline</h1><p>Please check your connection</p></body></html>";

/// Placeholder body for stylesheets and scripts. A comment in both languages.
pub const OFFLINE_PLACEHOLDER: &str = "/* Offline */";

/// Blank image for media that could not be loaded: `404`, empty body.
pub fn blank_image() -> FetchResponse {
    FetchResponse::synthesized(StatusCode::NOT_FOUND, "image/png", Bytes::new())
}

/// Minimal offline page: `503`, `text/html`.
pub fn offline_document() -> FetchResponse {
    FetchResponse::synthesized(
        StatusCode::SERVICE_UNAVAILABLE,
        "text/html",
        Bytes::from_static(OFFLINE_HTML.as_bytes()),
    )
}

/// No-op placeholder for a sub-resource: `503` with a content type the page
/// can swallow. Stylesheets get `text/css`, everything else is served as
/// script.
pub fn placeholder(destination: Destination) -> FetchResponse {
    let content_type = match destination {
        Destination::Style => "text/css",
        _ => "text/javascript",
    };
    FetchResponse::synthesized(
        StatusCode::SERVICE_UNAVAILABLE,
        content_type,
        Bytes::from_static(OFFLINE_PLACEHOLDER.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_image() {
        let response = blank_image();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.content_type(), Some("image/png"));
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_offline_document() {
        let response = offline_document();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.content_type(), Some("text/html"));
        assert!(std::str::from_utf8(&response.body).unwrap().contains("Offline"));
    }

    #[test]
    fn test_placeholder_content_types() {
        assert_eq!(placeholder(Destination::Style).content_type(), Some("text/css"));
        assert_eq!(
            placeholder(Destination::Script).content_type(),
            Some("text/javascript")
        );
        assert_eq!(
            placeholder(Destination::Other).content_type(),
            Some("text/javascript")
        );
        assert_eq!(
            placeholder(Destination::Script).status,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
