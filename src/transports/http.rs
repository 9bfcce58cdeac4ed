use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::AuthflowError;
use crate::transport::{Outcome, Transport};
use crate::types::{AccessToken, ApiRequest, Method};

/// JSON-over-HTTP transport backed by `reqwest`.
///
/// Request paths are joined onto the base URL, so a base of
/// `https://host/api` and a path of `/auth/me` hit `https://host/api/auth/me`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create a new HTTP transport.
    ///
    /// Rejects cleartext `http://` URLs unless `allow_http` is `true` or the
    /// host is a loopback address.
    pub fn new(
        base_url: &str,
        headers: &HashMap<String, String>,
        timeout: Duration,
        allow_http: bool,
    ) -> Result<Self, AuthflowError> {
        let url = reqwest::Url::parse(base_url).map_err(|e| {
            transport_setup_error(format!("Invalid URL '{base_url}': {e}"))
        })?;

        match url.scheme() {
            "https" => {}
            "http" if allow_http || is_loopback(&url) => {}
            "http" => {
                return Err(transport_setup_error(format!(
                    "Cleartext HTTP is not allowed for '{base_url}'. \
                     Use https:// or set \"allowHttp\": true to permit insecure connections."
                )));
            }
            scheme => {
                return Err(transport_setup_error(format!(
                    "Unsupported URL scheme '{scheme}' in '{base_url}'"
                )));
            }
        }

        let mut header_map = HeaderMap::new();
        header_map.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        header_map.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );

        for (key, value) in headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                transport_setup_error(format!("Invalid header name '{key}': {e}"))
            })?;
            let val = HeaderValue::from_str(value).map_err(|e| {
                transport_setup_error(format!("Invalid header value for '{key}': {e}"))
            })?;
            header_map.insert(name, val);
        }

        let client = reqwest::Client::builder()
            .default_headers(header_map)
            .timeout(timeout)
            .build()
            .map_err(|e| AuthflowError::TransportError(Box::new(e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn is_loopback(url: &reqwest::Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.eq_ignore_ascii_case("localhost")
        || host
            .parse::<std::net::IpAddr>()
            .is_ok_and(|ip| ip.is_loopback())
}

fn transport_setup_error(detail: String) -> AuthflowError {
    AuthflowError::TransportError(detail.into())
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest, bearer: Option<&AccessToken>) -> Outcome {
        let url = self.url_for(&request.path);
        let mut http_req = self
            .client
            .request(to_reqwest_method(request.method), &url);

        for (name, value) in &request.headers {
            http_req = http_req.header(name.as_str(), value.as_str());
        }
        if let Some(token) = bearer {
            http_req = http_req.bearer_auth(token.as_str());
        }
        if let Some(ref body) = request.body {
            http_req = http_req.json(body);
        }

        tracing::debug!(method = %request.method, %url, retry = request.is_retry(), "sending request");

        let response = match http_req.send().await {
            Ok(r) => r,
            Err(e) => return Outcome::OtherFailure(AuthflowError::TransportError(Box::new(e))),
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => Outcome::classify(status, body),
            Err(e) => Outcome::OtherFailure(AuthflowError::TransportError(Box::new(e))),
        }
    }
}
