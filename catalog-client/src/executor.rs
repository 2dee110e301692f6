use std::future::Future;
use std::time::Duration;
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;
use crate::error::{CatalogError, CatalogResult};

/// Delays slept before each retry. Length is the number of retries.
pub const BACKOFF: [Duration; 4] = [
    Duration::from_millis(100),
    Duration::from_millis(500),
    Duration::from_millis(1000),
    Duration::from_millis(2000),
];

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the catalog agent, e.g. "http://127.0.0.1:8500"
    pub url: String,
    /// Static query parameters appended to every request
    pub params: Vec<(String, String)>,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8500".to_string(),
            params: Vec::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Outcome of a successful request
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Parsed body of a read
    Json(Value),
    /// A write was accepted
    Accepted,
}

/// Issues catalog requests, turning non-200 responses into errors and
/// retrying transient failures on a fixed backoff schedule.
///
/// There is no deduplication: a retried write may be applied twice, which
/// register and deregister both tolerate.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    client: Client,
    base_url: Url,
    params: Vec<(String, String)>,
    backoff: Vec<Duration>,
}

impl RequestExecutor {
    pub fn new(config: &ClientConfig) -> CatalogResult<Self> {
        let base_url = Url::parse(&config.url).map_err(|source| CatalogError::InvalidUrl {
            url: config.url.clone(),
            source,
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("catalog-client/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            params: config.params.clone(),
            backoff: BACKOFF.to_vec(),
        })
    }

    /// Replace the retry schedule
    pub fn with_backoff(mut self, backoff: Vec<Duration>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Resolve a path (which may already carry a query string) against the
    /// base URL, appending the static parameters.
    pub fn url_for(&self, path: &str) -> CatalogResult<Url> {
        let mut path = path.to_string();
        if !self.params.is_empty() {
            let separator = if path.contains('?') { '&' } else { '?' };
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.params)
                .finish();
            path.push(separator);
            path.push_str(&query);
        }

        self.base_url
            .join(&path)
            .map_err(|source| CatalogError::InvalidUrl { url: path, source })
    }

    /// Send one logical request. Reads return the parsed JSON body, writes
    /// return [`Reply::Accepted`]. The last failure is returned once the
    /// backoff schedule is used up.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Value>,
    ) -> CatalogResult<Reply> {
        let url = self.url_for(path)?;
        let method = &method;
        let url = &url;
        retry_with_backoff(&self.backoff, tokio::time::sleep, move || {
            self.send_once(method, url, payload)
        })
        .await
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        payload: Option<&Value>,
    ) -> CatalogResult<Reply> {
        let mut builder = self.client.request(method.clone(), url.clone());
        if let Some(body) = payload {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Backend {
                method: method.clone(),
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        if *method == Method::GET {
            let text = response.text().await?;
            let value = serde_json::from_str(&text)
                .map_err(|e| CatalogError::decode(format!("response body of {}", url), e))?;
            Ok(Reply::Json(value))
        } else {
            Ok(Reply::Accepted)
        }
    }
}

/// Run `attempt` until it succeeds, fails with a non-retryable error, or the
/// schedule runs out. `sleep` is awaited with each delay before retrying.
pub async fn retry_with_backoff<T, F, Fut, S, SFut>(
    schedule: &[Duration],
    mut sleep: S,
    mut attempt: F,
) -> CatalogResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CatalogResult<T>>,
    S: FnMut(Duration) -> SFut,
    SFut: Future<Output = ()>,
{
    let mut delays = schedule.iter();
    loop {
        let err = match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => err,
            Err(err) => return Err(err),
        };

        let Some(&delay) = delays.next() else {
            return Err(err);
        };

        tracing::warn!(
            "Catalog request failed, retrying in {}s: {}",
            delay.as_secs_f64(),
            err
        );
        sleep(delay).await;
    }
}
