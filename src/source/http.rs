//! JSON-over-HTTP remote source.
//!
//! Speaks a small REST contract: `GET /listing?root=<folder>` returns the
//! full tree as JSON, `GET /content?url=<item url>` returns raw bytes.
//! Optional bearer-token auth. The request phase of both operations is
//! retried with exponential backoff; a content stream is never retried
//! once bytes have started flowing into the destination.

use std::io::Write;

use crate::config::Config;
use crate::error::TetherError;

use super::{RemoteItem, RemoteListing, RemoteSource};

const ATTEMPTS: usize = 3;

pub struct HttpSource {
    client: reqwest::blocking::Client,
    base_url: String,
    root_folder: String,
    token: Option<String>,
}

impl HttpSource {
    pub fn new(config: &Config) -> Result<Self, TetherError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TetherError::transfer("http client setup", e))?;

        Ok(HttpSource {
            client,
            base_url: config.remote_url.trim_end_matches('/').to_string(),
            root_folder: config.root_folder.clone(),
            token: config.token.clone(),
        })
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> reqwest::blocking::RequestBuilder {
        let mut request = self
            .client
            .get(format!("{}{path}", self.base_url))
            .query(query);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        request
    }

    /// Send a request, retrying transient failures, and reject non-2xx
    /// responses.
    fn send_checked(
        &self,
        label: &str,
        build: impl Fn() -> reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response, TetherError> {
        let mut last: Option<String> = None;

        for attempt in 0..ATTEMPTS {
            match build().send() {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) if resp.status() == reqwest::StatusCode::UNAUTHORIZED => {
                    // auth problems don't get better on retry
                    return Err(TetherError::transfer(label, "unauthorized (check token)"));
                }
                Ok(resp) => last = Some(format!("status {}", resp.status())),
                Err(e) => last = Some(e.to_string()),
            }

            if attempt + 1 < ATTEMPTS {
                std::thread::sleep(std::time::Duration::from_millis(200 * (1 << attempt)));
            }
        }

        Err(TetherError::transfer(
            label,
            last.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

impl RemoteSource for HttpSource {
    fn name(&self) -> &'static str {
        "http"
    }

    fn fetch_listing(&self) -> Result<RemoteListing, TetherError> {
        let resp = self.send_checked("listing", || {
            self.get("/listing", &[("root", self.root_folder.as_str())])
        })?;

        resp.json::<RemoteListing>()
            .map_err(|e| TetherError::transfer("listing", e))
    }

    fn fetch_content(&self, item: &RemoteItem, dest: &mut dyn Write) -> Result<u64, TetherError> {
        let label = format!("content {}", item.url);
        let mut resp =
            self.send_checked(&label, || self.get("/content", &[("url", item.url.as_str())]))?;

        resp.copy_to(dest)
            .map_err(|e| TetherError::transfer(label.as_str(), e))
    }
}
