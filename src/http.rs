// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use url::Url;

/// A streaming response body
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// A GET request against the vendor API
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// Fully built URL including the query string
    pub url: Url,
    /// Extra request headers
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }
}

/// A fully buffered response
#[derive(Debug, Clone)]
pub struct BodyResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Response of a request issued without following redirects
#[derive(Debug, Clone)]
pub struct RedirectResponse {
    pub status: u16,
    /// Location header value, if present
    pub location: Option<String>,
}

/// HTTP response with status, headers of interest, and body stream
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Content-Length header value, if present
    pub content_length: Option<u64>,
    /// Content-Disposition header value, if present
    pub content_disposition: Option<String>,
    /// Response body as a stream of bytes
    pub body: ByteStream,
}

/// HTTP client abstraction for testability
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetch the entire response body as bytes
    async fn get_bytes(&self, request: &ApiRequest) -> Result<BodyResponse, reqwest::Error>;

    /// Issue a GET without following redirects and report where it points
    async fn get_location(&self, request: &ApiRequest) -> Result<RedirectResponse, reqwest::Error>;

    /// POST an url-encoded form and buffer the response
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<BodyResponse, reqwest::Error>;

    /// Get a streaming response for large downloads
    async fn get_stream(&self, url: &str) -> Result<HttpResponse, reqwest::Error>;
}

/// Default HTTP client implementation using reqwest
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
    no_redirect: reqwest::Client,
}

impl ReqwestClient {
    /// Create a new ReqwestClient with default settings
    pub fn new() -> Result<Self, reqwest::Error> {
        let no_redirect = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client: reqwest::Client::builder().build()?,
            no_redirect,
        })
    }

    fn build_get(client: &reqwest::Client, request: &ApiRequest) -> reqwest::RequestBuilder {
        request
            .headers
            .iter()
            .fold(client.get(request.url.as_str()), |builder, (name, value)| {
                builder.header(name.as_str(), value.as_str())
            })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_bytes(&self, request: &ApiRequest) -> Result<BodyResponse, reqwest::Error> {
        tracing::debug!(url = %request.url, "GET");
        let response = Self::build_get(&self.client, request).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(BodyResponse { status, body })
    }

    async fn get_location(&self, request: &ApiRequest) -> Result<RedirectResponse, reqwest::Error> {
        tracing::debug!(url = %request.url, "GET (no redirect)");
        let response = Self::build_get(&self.no_redirect, request).send().await?;
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(String::from);

        Ok(RedirectResponse {
            status: response.status().as_u16(),
            location,
        })
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<BodyResponse, reqwest::Error> {
        tracing::debug!(url, "POST");
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();

        let response = self
            .client
            .post(url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(BodyResponse { status, body })
    }

    async fn get_stream(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        use futures::StreamExt;

        tracing::debug!(url, "GET (stream)");
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let content_length = response.content_length();
        let content_disposition = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(String::from);

        let body: ByteStream = Box::pin(response.bytes_stream().map(|result| result));

        Ok(HttpResponse {
            status,
            content_length,
            content_disposition,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reqwest_client_can_be_created() {
        let _client = ReqwestClient::new().unwrap();
    }

    #[test]
    fn reqwest_client_can_be_cloned() {
        let client = ReqwestClient::new().unwrap();
        let _cloned = client.clone();
    }

    #[test]
    fn api_request_collects_headers() {
        let request = ApiRequest::new(Url::parse("https://api.example.com/1.0/library").unwrap())
            .header("client-id", "0")
            .header("Authorization", "Bearer abc");

        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.headers[0], ("client-id".to_string(), "0".to_string()));
    }
}
