//! JSON-over-HTTP fetch of a single endpoint.
//!
//! One GET per call, no retries: a failed request is reported, not repeated.
//! Each call is tagged with a request id that appears on every `http.*`
//! tracing event it emits. Decode failures carry a body snippet.
//!
//! ```no_run
//! # async fn demo() -> Result<(), aprwatch_http::HttpError> {
//! let client = aprwatch_http::HttpClient::new("https://cdn.example.org/datav2.json")?;
//! let got: serde_json::Value = client.get_json().await?;
//! # Ok(()) }
//! ```

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

const SNIPPET_MAX: usize = 500;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

/// Client bound to one JSON endpoint.
#[derive(Clone, Debug)]
pub struct HttpClient {
    url: Url,
    inner: Client,
    pub timeout: Duration,
}

impl HttpClient {
    /// ```
    /// use aprwatch_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://cdn.example.org/datav2.json")?;
    /// assert_eq!(client.timeout, Duration::from_secs(15));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(url: &str) -> Result<Self, HttpError> {
        let url = Url::parse(url).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("aprwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            url,
            inner,
            timeout: Duration::from_secs(15),
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.timeout = dur;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// GET the endpoint and decode its JSON body.
    pub async fn get_json<T>(&self) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let req_id = Uuid::new_v4().simple().to_string();
        tracing::debug!(
            req_id=%req_id,
            url=%self.url,
            timeout_ms=self.timeout.as_millis() as u64,
            "http.request.start"
        );

        let t0 = std::time::Instant::now();
        let sent = match self
            .inner
            .get(self.url.clone())
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(resp) => {
                let status = resp.status();
                let header_id = resp
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                resp.bytes().await.map(|bytes| (status, header_id, bytes))
            }
            Err(err) => Err(err),
        };
        let (status, header_id, bytes) = sent.map_err(|err| {
            tracing::warn!(req_id=%req_id, message=%err, "http.network_error");
            HttpError::Network(err.to_string())
        })?;

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=t0.elapsed().as_millis() as u64,
            body_len=bytes.len(),
            "http.response"
        );

        if !status.is_success() {
            let message = extract_error_message(&bytes);
            tracing::warn!(req_id=%req_id, %status, message=%message, "http.error");
            return Err(HttpError::Api {
                status,
                message,
                request_id: header_id.unwrap_or(req_id),
            });
        }

        serde_json::from_slice::<T>(&bytes).map_err(|e| {
            let snippet = snip_body(&bytes);
            tracing::warn!(
                req_id=%req_id,
                serde_line=%e.line(),
                serde_col=%e.column(),
                serde_err=%e,
                body_snippet=%snippet,
                "http.response.decode_error"
            );
            HttpError::Decode(e.to_string(), snippet)
        })
    }
}

fn extract_error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        error: String,
    }

    match serde_json::from_slice::<Msg>(body) {
        Ok(m) if !m.message.is_empty() => m.message,
        Ok(m) if !m.error.is_empty() => m.error,
        _ => snip_body(body),
    }
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > SNIPPET_MAX {
        let mut cut = SNIPPET_MAX;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}
