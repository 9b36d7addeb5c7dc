//! Responses handed back to the page.

use bytes::Bytes;
use gate7_net::Response;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::cache::CacheEntry;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    /// Built locally because neither network nor cache could answer.
    Synthesized,
}

/// Fetch event response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Status code.
    pub status: StatusCode,

    /// Response headers.
    pub headers: HeaderMap,

    /// Response body.
    pub body: Bytes,

    /// Origin of the response.
    pub source: ResponseSource,
}

impl FetchResponse {
    /// Wrap a network response.
    pub fn from_network(response: Response) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
            source: ResponseSource::Network,
        }
    }

    /// Replay a cache entry. Headers are appended so repeated names such as
    /// `Link` or `Set-Cookie` come back with every value.
    pub fn from_cache(entry: &CacheEntry) -> Self {
        let mut headers = HeaderMap::with_capacity(entry.headers.len());
        for (name, value) in &entry.headers {
            if let (Ok(n), Ok(v)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                headers.append(n, v);
            }
        }

        Self {
            status: StatusCode::from_u16(entry.status).unwrap_or(StatusCode::OK),
            headers,
            body: entry.body.clone(),
            source: ResponseSource::Cache,
        }
    }

    /// Build a locally synthesized response.
    pub fn synthesized(status: StatusCode, content_type: &'static str, body: Bytes) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));

        Self {
            status,
            headers,
            body,
            source: ResponseSource::Synthesized,
        }
    }

    /// Get content-type from headers.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn from_cache_hit(&self) -> bool {
        self.source == ResponseSource::Cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_response_from_cache() {
        let headers = vec![("content-type".to_string(), "text/css".to_string())];
        let entry = CacheEntry {
            url: "https://gate7.vn/css/style-gate7.css".to_string(),
            method: "GET".to_string(),
            status: 200,
            headers,
            body: Bytes::from_static(b"body{}"),
            cached_at: 0,
        };

        let response = FetchResponse::from_cache(&entry);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type(), Some("text/css"));
        assert_eq!(response.body, entry.body);
        assert!(response.from_cache_hit());
    }

    #[test]
    fn test_repeated_headers_survive_caching() {
        use gate7_net::RequestId;
        use http::header::LINK;
        use url::Url;

        let preload_css = "</css/style-gate7.css>; rel=preload; as=style";
        let preload_js = "</js/language-switcher.js>; rel=preload; as=script";
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        headers.append(LINK, HeaderValue::from_static(preload_css));
        headers.append(LINK, HeaderValue::from_static(preload_js));

        let url = Url::parse("https://gate7.vn/index.html").unwrap();
        let response = Response {
            request_id: RequestId::new(),
            url: url.clone(),
            status: StatusCode::OK,
            headers,
            content_type: None,
            body: Bytes::from_static(b"<html></html>"),
        };

        // Through the same JSON form the store writes to disk.
        let entry = CacheEntry::from_response(&response, &url);
        let entry: CacheEntry =
            serde_json::from_str(&serde_json::to_string(&entry).unwrap()).unwrap();

        let replayed = FetchResponse::from_cache(&entry);
        let links: Vec<&str> = replayed
            .headers
            .get_all(LINK)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(links, vec![preload_css, preload_js]);
        assert_eq!(replayed.content_type(), Some("text/html"));
        assert_eq!(replayed.headers.len(), 3);
    }

    #[test]
    fn test_synthesized_sets_content_type() {
        let response =
            FetchResponse::synthesized(StatusCode::SERVICE_UNAVAILABLE, "text/css", Bytes::new());
        assert_eq!(response.content_type(), Some("text/css"));
        assert_eq!(response.source, ResponseSource::Synthesized);
    }
}
