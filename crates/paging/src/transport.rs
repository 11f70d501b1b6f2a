//! Authenticated JSON GET

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};

/// Fetches one JSON document with a bearer credential.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn PageTransport>`).
pub trait PageTransport: Send + Sync {
    fn get_json<'a>(
        &'a self,
        url: &'a str,
        bearer: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>>;
}

/// reqwest-backed transport.
///
/// Timeouts come from the client; build it with
/// `reqwest::Client::builder().timeout(..)`. A timeout surfaces as
/// [`Error::Http`] like any other transport failure.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl PageTransport for HttpTransport {
    fn get_json<'a>(
        &'a self,
        url: &'a str,
        bearer: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .bearer_auth(bearer)
                .send()
                .await
                .map_err(|e| Error::Http(format!("GET {url} failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| String::from("<no body>"));
                warn!(url, status = status.as_u16(), "resource fetch rejected");
                return Err(Error::ResourceFetch {
                    url: url.to_string(),
                    status: status.as_u16(),
                    body,
                });
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| Error::Http(format!("GET {url} returned invalid JSON: {e}")))
        })
    }
}
