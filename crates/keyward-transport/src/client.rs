//! HTTP transport implementation using `reqwest`.

use crate::{ApiRequest, ApiResponse, HttpTransport, Method, TransportError};

/// A `reqwest`-backed [`HttpTransport`] bound to one API base URL.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: reqwest::Url,
}

impl ReqwestTransport {
    /// Creates a transport for the API at `base_url`, e.g.
    /// `http://localhost:3333`.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidUrl`] if `base_url` does not parse
    /// or cannot serve as a base.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let mut base_url = reqwest::Url::parse(base_url)
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(base_url.into()));
        }
        // `Url::join` replaces the last segment unless the base ends in `/`.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    /// Use a custom HTTP client (for connection pool reuse, timeouts, or
    /// testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// The API base URL requests are resolved against.
    pub fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> Result<reqwest::Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Patch => Self::PATCH,
            Method::Delete => Self::DELETE,
        }
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: ApiRequest,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.path)?;
        let mut builder = self.http.request(request.method.into(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?
            .to_vec();

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status,
            "api call completed"
        );
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_garbage_url() {
        let result = ReqwestTransport::new("not a url");
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn test_url_for_keeps_base_path() {
        let transport = ReqwestTransport::new("http://localhost:3333/api").unwrap();
        assert_eq!(transport.base_url().as_str(), "http://localhost:3333/api/");

        let url = transport.url_for("/me").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3333/api/me");
    }

    #[test]
    fn test_url_for_root_base() {
        let transport = ReqwestTransport::new("http://localhost:3333").unwrap();
        let url = transport.url_for("refresh").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3333/refresh");
    }
}
