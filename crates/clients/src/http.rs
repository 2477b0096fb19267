//! Shared reqwest plumbing for the HTTP clients.

use std::time::Duration;

use common::Credential;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header::AUTHORIZATION};
use serde::de::DeserializeOwned;

use crate::error::{RemoteError, RemoteService, Result};

/// Maps a non-success HTTP status onto the remote error taxonomy.
pub(crate) fn classify(status: StatusCode) -> Option<RemoteError> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound,
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized,
        StatusCode::FORBIDDEN => RemoteError::Forbidden,
        other => RemoteError::Unavailable(format!("unexpected status {other}")),
    })
}

/// A base URL plus a configured reqwest client.
#[derive(Debug, Clone)]
pub(crate) struct RemoteHttp {
    service: RemoteService,
    base_url: String,
    http: Client,
}

impl RemoteHttp {
    pub(crate) fn new(
        service: RemoteService,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> std::result::Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            service,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Starts a request, attaching the caller's credential verbatim when present.
    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        credential: Option<&Credential>,
    ) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match credential {
            Some(credential) => builder.header(AUTHORIZATION, credential.as_str()),
            None => builder,
        }
    }

    /// Sends a request and classifies any failure.
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(service = %self.service, error = %e, "remote call failed");
            RemoteError::from(e)
        })?;

        match classify(response.status()) {
            None => Ok(response),
            Some(err) => {
                tracing::warn!(
                    service = %self.service,
                    status = %response.status(),
                    "remote call rejected"
                );
                Err(err)
            }
        }
    }

    /// Decodes a JSON body, treating an empty or `null` body as `None`.
    pub(crate) async fn decode_optional<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<Option<T>> {
        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice::<Option<T>>(&body).map_err(|e| {
            tracing::warn!(service = %self.service, error = %e, "undecodable remote body");
            RemoteError::Unavailable(format!("invalid response body: {e}"))
        })
    }

    /// Probes the service's health endpoint.
    pub(crate) async fn probe(&self) -> bool {
        match self.http.get(self.url("/actuator/health")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(service = %self.service, error = %e, "health probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_success_is_none() {
        assert_eq!(classify(StatusCode::OK), None);
        assert_eq!(classify(StatusCode::NO_CONTENT), None);
    }

    #[test]
    fn test_classify_client_errors() {
        assert_eq!(classify(StatusCode::NOT_FOUND), Some(RemoteError::NotFound));
        assert_eq!(
            classify(StatusCode::UNAUTHORIZED),
            Some(RemoteError::Unauthorized)
        );
        assert_eq!(classify(StatusCode::FORBIDDEN), Some(RemoteError::Forbidden));
    }

    #[test]
    fn test_classify_everything_else_as_unavailable() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::CONFLICT,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            assert!(matches!(
                classify(status),
                Some(RemoteError::Unavailable(_))
            ));
        }
    }

    #[test]
    fn test_base_url_trailing_slash_is_dropped() {
        let http = RemoteHttp::new(
            RemoteService::Directory,
            "http://users.local/",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(http.url("/api/v1/users/1"), "http://users.local/api/v1/users/1");
    }
}
