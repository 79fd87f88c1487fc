use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderValue, COOKIE};
use reqwest::{Client, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::Settings;
use crate::credentials::Credentials;
use crate::error::{CrawlError, Result};

/// A fetched text document.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: u16,
    pub body: String,
    pub final_url: String,
}

impl Page {
    /// Body of a 2xx response; anything else is a transport failure.
    pub fn into_body(self) -> Result<String> {
        if (200..300).contains(&self.status) {
            Ok(self.body)
        } else {
            Err(CrawlError::Status {
                url: self.final_url,
                status: self.status,
            })
        }
    }
}

/// HTTP access used by every stage. Credentials are passed on each call and
/// never kept by the implementation.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get(&self, url: &str, credentials: &Credentials, query: &[(String, String)])
        -> Result<Page>;

    /// Stream the body into `dest` if the server answers 200; otherwise write
    /// nothing. Returns the status either way.
    async fn download(&self, url: &str, credentials: &Credentials, dest: &Path) -> Result<u16>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout())
            .gzip(true)
            .build()
            .map_err(|e| CrawlError::transport(&settings.base_url, e))?;
        Ok(Self { client })
    }

    fn request(&self, url: &str, credentials: &Credentials) -> Result<reqwest::RequestBuilder> {
        let mut req = self.client.get(url);
        if !credentials.is_empty() {
            let cookie = HeaderValue::from_str(&credentials.cookie_header())
                .map_err(|e| CrawlError::transport(url, e))?;
            req = req.header(COOKIE, cookie);
        }
        Ok(req)
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get(
        &self,
        url: &str,
        credentials: &Credentials,
        query: &[(String, String)],
    ) -> Result<Page> {
        let resp = self
            .request(url, credentials)?
            .query(query)
            .send()
            .await
            .map_err(|e| CrawlError::transport(url, e))?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let body = resp
            .text()
            .await
            .map_err(|e| CrawlError::transport(url, e))?;
        debug!("GET {} -> {} ({} bytes)", final_url, status, body.len());

        Ok(Page {
            status,
            body,
            final_url,
        })
    }

    async fn download(&self, url: &str, credentials: &Credentials, dest: &Path) -> Result<u16> {
        let resp = self
            .request(url, credentials)?
            .send()
            .await
            .map_err(|e| CrawlError::transport(url, e))?;

        let status = resp.status();
        if status != StatusCode::OK {
            debug!("GET {} -> {}, nothing written", url, status);
            return Ok(status.as_u16());
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = resp.bytes_stream();
        let mut written = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| CrawlError::transport(url, e))?;
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;
        debug!("GET {} -> {} ({} bytes)", url, dest.display(), written);

        Ok(status.as_u16())
    }
}

// ── Tests ──
