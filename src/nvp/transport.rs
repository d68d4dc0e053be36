//! HTTP transport seam for the NVP client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::Form;

use super::{BodyEncoding, ClientError, NvpRequest};

/// What came back over the wire, before any NVP parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

/// Sends one request, exactly once. Retries are the caller's business.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: NvpRequest) -> Result<RawResponse, ClientError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: NvpRequest) -> Result<RawResponse, ClientError> {
        (**self).send(request).await
    }
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: NvpRequest) -> Result<RawResponse, ClientError> {
        let mut builder = self.client.post(request.url());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.encoding() {
            BodyEncoding::FormUrlEncoded => builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(request.encode_body()),
            BodyEncoding::Multipart => {
                let form = request
                    .fields()
                    .iter()
                    .fold(Form::new(), |form, (name, value)| {
                        form.text(name.to_string(), value.to_string())
                    });
                builder.multipart(form)
            }
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}


#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn http_transport_posts_form_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/nvp"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(header("x-pp-authorization", "PWD=p&USER=u&SIGNATURE=s"))
            .and(body_string_contains("METHOD=DoVoid"))
            .and(body_string_contains("NOTE=two+words"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ACK=Success"))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = NvpRequest::new(format!("{}/nvp", server.uri()));
        request.set("METHOD", "DoVoid");
        request.set("NOTE", "two words");
        request.set_header("X-PP-AUTHORIZATION", "PWD=p&USER=u&SIGNATURE=s");

        let transport = HttpTransport::new(None).unwrap();
        let response = transport.send(request).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "ACK=Success");
    }

    #[tokio::test]
    async fn http_transport_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(Some(Duration::from_secs(5))).unwrap();
        let response = transport
            .send(NvpRequest::new(server.uri()))
            .await
            .unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(response.body, "oops");
    }

    #[tokio::test]
    async fn http_transport_connection_error() {
        // nothing listens on port 9 of localhost
        let transport = HttpTransport::new(Some(Duration::from_secs(5))).unwrap();
        let err = transport
            .send(NvpRequest::new("http://127.0.0.1:9/nvp"))
            .await
            .unwrap_err();
        assert!(err.is_communication());
    }

    #[tokio::test]
    async fn http_transport_multipart_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("name=\"METHOD\""))
            .and(body_string_contains("DoVoid"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ACK=Success"))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = NvpRequest::new(server.uri());
        request.set("METHOD", "DoVoid");
        request.set_encoding(BodyEncoding::Multipart);

        let transport = HttpTransport::new(None).unwrap();
        let response = transport.send(request).await.unwrap();
        assert_eq!(response.status, 200);
    }
}
