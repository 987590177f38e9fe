// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use bytes::Bytes;
use reqwest::StatusCode;
use tracing::debug;

use crate::error::FetchError;
use crate::http::HttpClient;

/// Fetch raw feed bytes from a URL (without parsing)
///
/// Anything other than `200 OK` is a failure, including other 2xx codes.
pub async fn fetch_feed_bytes<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
) -> Result<Bytes, FetchError> {
    let response = client
        .get(url)
        .await
        .map_err(|e| FetchError::RequestFailed {
            url: url.to_string(),
            source: e,
        })?;

    if response.status != 200 {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: describe_status(response.status),
        });
    }

    debug!(url, bytes = response.body.len(), "fetched feed");
    Ok(response.body)
}

/// Render a status code as e.g. `404 Not Found`
fn describe_status(code: u16) -> String {
    StatusCode::from_u16(code)
        .map(|status| status.to_string())
        .unwrap_or_else(|_| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use async_trait::async_trait;

    struct StaticClient {
        status: u16,
        body: &'static str,
    }

    #[async_trait]
    impl HttpClient for StaticClient {
        async fn get(&self, _url: &str) -> Result<HttpResponse, reqwest::Error> {
            Ok(HttpResponse {
                status: self.status,
                body: Bytes::from_static(self.body.as_bytes()),
            })
        }
    }

    #[tokio::test]
    async fn ok_response_returns_body() {
        let client = StaticClient {
            status: 200,
            body: "<rss/>",
        };
        let bytes = fetch_feed_bytes(&client, "https://example.com/feed.xml")
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"<rss/>");
    }

    #[tokio::test]
    async fn not_found_is_reported_with_status_text() {
        let client = StaticClient {
            status: 404,
            body: "",
        };
        let err = fetch_feed_bytes(&client, "https://example.com/feed.xml")
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::HttpStatus { .. }));
        assert!(err.to_string().contains("404 Not Found"));
    }

    #[tokio::test]
    async fn other_success_codes_are_rejected() {
        let client = StaticClient {
            status: 204,
            body: "",
        };
        let err = fetch_feed_bytes(&client, "https://example.com/feed.xml")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("204"));
    }

    #[test]
    fn unknown_status_codes_render_numerically() {
        assert_eq!(describe_status(599), "599 <unknown status code>");
        assert_eq!(describe_status(1000), "1000");
    }
}
