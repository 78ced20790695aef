//! Generic HTTP call primitive used by every adapter, plus the reqwest-based
//! implementation. Retry and connection pooling live above this seam, never
//! inside adapters.

use std::collections::HashMap;
use std::pin::Pin;

use futures_core::Stream;
use serde_json::Value;

use crate::{AdapterError, adapter::AdapterFuture};

pub type RawByteStream<'a> = Pin<Box<dyn Stream<Item = Result<Vec<u8>, AdapterError>> + Send + 'a>>;

/// Minimal POST primitive: a JSON round trip and a raw streaming variant.
/// Adapters own URL construction and headers; the transport owns status
/// classification and body transfer.
pub trait HttpTransport: Send + Sync {
    fn post<'a>(
        &'a self,
        url: String,
        headers: HashMap<String, String>,
        body: Value,
    ) -> AdapterFuture<'a, Result<Value, AdapterError>>;

    fn post_stream<'a>(
        &'a self,
        url: String,
        headers: HashMap<String, String>,
        body: Value,
    ) -> AdapterFuture<'a, Result<RawByteStream<'a>, AdapterError>>;
}

/// Pulls a human-readable message out of a `{"error":{"message":…}}` body.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<Value>(body).ok()?;
    parsed
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[cfg(feature = "provider-openai")]
pub use reqwest_transport::ReqwestTransport;

#[cfg(feature = "provider-openai")]
mod reqwest_transport {
    use std::collections::HashMap;

    use futures_util::StreamExt;
    use reqwest::{Client, Response, StatusCode};
    use serde_json::Value;

    use super::{HttpTransport, RawByteStream, extract_error_message};
    use crate::{AdapterError, adapter::AdapterFuture};

    #[derive(Debug, Clone, Default)]
    pub struct ReqwestTransport {
        client: Client,
    }

    impl ReqwestTransport {
        pub fn new(client: Client) -> Self {
            Self { client }
        }

        fn request(
            &self,
            url: String,
            headers: HashMap<String, String>,
            body: Value,
        ) -> reqwest::RequestBuilder {
            let mut builder = self.client.post(url);
            for (name, value) in headers {
                builder = builder.header(name, value);
            }
            builder.json(&body)
        }

        fn map_send_error(err: reqwest::Error) -> AdapterError {
            if err.is_timeout() {
                AdapterError::timeout(err.to_string())
            } else {
                AdapterError::transport(err.to_string())
            }
        }

        async fn classify_failure(response: Response) -> AdapterError {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body)
                .unwrap_or_else(|| format!("request failed with status {status}"));

            match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    AdapterError::authentication(message)
                }
                StatusCode::TOO_MANY_REQUESTS => AdapterError::rate_limited(message),
                StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                    AdapterError::timeout(message)
                }
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    AdapterError::invalid_request(message)
                }
                StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                    AdapterError::unavailable(message)
                }
                _ => AdapterError::transport(message),
            }
        }
    }

    impl HttpTransport for ReqwestTransport {
        fn post<'a>(
            &'a self,
            url: String,
            headers: HashMap<String, String>,
            body: Value,
        ) -> AdapterFuture<'a, Result<Value, AdapterError>> {
            Box::pin(async move {
                let response = self
                    .request(url, headers, body)
                    .send()
                    .await
                    .map_err(Self::map_send_error)?;

                if !response.status().is_success() {
                    return Err(Self::classify_failure(response).await);
                }

                response
                    .json::<Value>()
                    .await
                    .map_err(|err| AdapterError::transport(err.to_string()))
            })
        }

        fn post_stream<'a>(
            &'a self,
            url: String,
            headers: HashMap<String, String>,
            body: Value,
        ) -> AdapterFuture<'a, Result<RawByteStream<'a>, AdapterError>> {
            Box::pin(async move {
                let response = self
                    .request(url, headers, body)
                    .send()
                    .await
                    .map_err(Self::map_send_error)?;

                if !response.status().is_success() {
                    return Err(Self::classify_failure(response).await);
                }

                let bytes = response.bytes_stream().map(|item| {
                    item.map(|chunk| chunk.to_vec())
                        .map_err(|err| AdapterError::transport(err.to_string()))
                });

                Ok(Box::pin(bytes) as RawByteStream<'a>)
            })
        }
    }
}
