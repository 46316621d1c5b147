use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT},
    Client, Url,
};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::FetchError;

pub const CASE_BY_CNR_PATH: &str = "cases/cnr";
pub const CASE_SEARCH_PATH: &str = "cases/search";
pub const CAUSE_LIST_PATH: &str = "cause_list";
pub const CASE_DOCUMENT_PATH: &str = "cases/document";

/// One GET against the portal, relative to the configured base url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub path: &'static str,
    pub params: Vec<(&'static str, String)>,
    /// Hard stop for the whole call, retries included.
    pub deadline: Option<Instant>,
}

impl FetchRequest {
    pub fn new(path: &'static str) -> Self {
        Self {
            path,
            params: Vec::new(),
            deadline: None,
        }
    }

    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.params.push((key, value.into()));
        self
    }

    pub fn deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Anything that can answer a portal request: the network, or a fixture.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<RawResponse, FetchError>;
}

/// Portal client over HTTP. Holds one `reqwest::Client` so connections are reused.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: Url,
    config: ClientConfig,
}

impl HttpFetcher {
    pub fn new(config: ClientConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| FetchError::Client(format!("invalid user agent: {e}")))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        // `Url::join` drops the last segment unless the base ends with a slash.
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).map_err(|e| FetchError::Client(format!("invalid base url: {e}")))?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Requests a page and returns the body. Non 2xx is an error.
    async fn request_page(
        &self,
        url: &Url,
        params: &[(&'static str, String)],
    ) -> Result<RawResponse, FetchError> {
        let res = self.client.get(url.clone()).query(params).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }
        let final_url = res.url().to_string();
        let body = res.bytes().await?.to_vec();
        Ok(RawResponse {
            url: final_url,
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<RawResponse, FetchError> {
        let url = self
            .base_url
            .join(req.path)
            .map_err(|e| FetchError::Client(e.to_string()))?;

        let mut retry = 0;
        loop {
            let remaining = req
                .deadline
                .map(|d| d.saturating_duration_since(Instant::now()));
            if remaining.is_some_and(|r| r.is_zero()) {
                return Err(FetchError::DeadlineExceeded);
            }
            let budget = remaining.map_or(self.config.timeout, |r| r.min(self.config.timeout));

            debug!(url = %url, attempt = retry + 1, "fetching");
            let outcome = match timeout(budget, self.request_page(&url, &req.params)).await {
                Ok(outcome) => outcome,
                Err(_) if budget < self.config.timeout => Err(FetchError::DeadlineExceeded),
                Err(_) => Err(FetchError::Timeout),
            };

            let err = match outcome {
                Ok(res) => {
                    debug!(url = %res.url, bytes = res.body.len(), "fetched");
                    return Ok(res);
                }
                Err(err) => err,
            };

            if !err.is_transient() || retry >= self.config.max_retries {
                warn!(url = %url, attempts = retry + 1, error = %err, "giving up");
                return Err(err);
            }

            retry += 1;
            let delay = self.config.backoff(retry);
            if req.deadline.is_some_and(|d| Instant::now() + delay >= d) {
                warn!(url = %url, error = %err, "deadline reached before next retry");
                return Err(FetchError::DeadlineExceeded);
            }
            warn!(url = %url, error = %err, ?delay, retry, "transient failure, retrying");
            sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{extract::State, http::HeaderMap as AxumHeaders, http::StatusCode, routing::get, Router};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{addr}/")
    }

    fn config(base_url: String, max_retries: u32) -> ClientConfig {
        ClientConfig {
            base_url,
            max_retries,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(40),
            timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    /// Answers `status` for the first `fail_times` hits, then 200.
    async fn flaky_server(status: StatusCode, fail_times: usize) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/cause_list",
                get(
                    move |State(hits): State<Arc<AtomicUsize>>| async move {
                        let n = hits.fetch_add(1, Ordering::SeqCst);
                        if n < fail_times {
                            (status, "nope".to_string())
                        } else {
                            (StatusCode::OK, "<table id=\"cause_list\"></table>".to_string())
                        }
                    },
                ),
            )
            .with_state(hits.clone());
        (serve(router).await, hits)
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_success() {
        let (base, hits) = flaky_server(StatusCode::SERVICE_UNAVAILABLE, 2).await;
        let fetcher = HttpFetcher::new(config(base, 3)).unwrap();

        let res = fetcher
            .fetch(&FetchRequest::new(CAUSE_LIST_PATH).param("court_code", "01"))
            .await
            .unwrap();
        assert_eq!(res.status, 200);
        assert!(res.text().contains("cause_list"));
        assert!(res.url.contains("court_code=01"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let (base, hits) = flaky_server(StatusCode::INTERNAL_SERVER_ERROR, usize::MAX).await;
        let fetcher = HttpFetcher::new(config(base, 2)).unwrap();

        let err = fetcher
            .fetch(&FetchRequest::new(CAUSE_LIST_PATH))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(500)));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (base, hits) = flaky_server(StatusCode::NOT_FOUND, usize::MAX).await;
        let fetcher = HttpFetcher::new(config(base, 5)).unwrap();

        let err = fetcher
            .fetch(&FetchRequest::new(CAUSE_LIST_PATH))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(404)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_portal_times_out() {
        let router = Router::new().route(
            "/cases/cnr",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "late"
            }),
        );
        let base = serve(router).await;
        let fetcher = HttpFetcher::new(ClientConfig {
            timeout: Duration::from_millis(100),
            ..config(base, 0)
        })
        .unwrap();

        let err = fetcher
            .fetch(&FetchRequest::new(CASE_BY_CNR_PATH))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout));
    }

    #[tokio::test]
    async fn deadline_aborts_pending_retries() {
        let (base, hits) = flaky_server(StatusCode::BAD_GATEWAY, usize::MAX).await;
        let fetcher = HttpFetcher::new(ClientConfig {
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(1),
            ..config(base, 10)
        })
        .unwrap();

        let started = Instant::now();
        let req = FetchRequest::new(CAUSE_LIST_PATH)
            .deadline(Some(started + Duration::from_millis(300)));
        let err = fetcher.fetch(&req).await.unwrap_err();

        assert!(matches!(err, FetchError::DeadlineExceeded));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(hits.load(Ordering::SeqCst) < 11);
    }

    #[tokio::test]
    async fn refused_connection_is_typed() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFetcher::new(config(format!("http://{addr}/"), 0)).unwrap();
        let err = fetcher
            .fetch(&FetchRequest::new(CASE_BY_CNR_PATH))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::ConnectionRefused(_)), "{err:?}");
    }

    #[tokio::test]
    async fn sends_browser_user_agent() {
        let router = Router::new().route(
            "/portal/cases/cnr",
            get(|headers: AxumHeaders| async move {
                headers
                    .get("user-agent")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            }),
        );
        let base = serve(router).await;
        // base without trailing slash still keeps its last segment
        let fetcher = HttpFetcher::new(config(format!("{base}portal"), 0)).unwrap();

        let res = fetcher
            .fetch(&FetchRequest::new(CASE_BY_CNR_PATH))
            .await
            .unwrap();
        assert!(res.text().starts_with("Mozilla/5.0"));
    }

    #[test]
    fn request_builder_keeps_params_in_order() {
        let req = FetchRequest::new(CASE_SEARCH_PATH)
            .param("case_type", "Civil")
            .param("case_no", "12345")
            .param("rgyear", "2023");
        assert_eq!(req.get_param("case_no"), Some("12345"));
        assert_eq!(req.params[2].0, "rgyear");
        assert_eq!(req.get_param("cino"), None);
    }
}
