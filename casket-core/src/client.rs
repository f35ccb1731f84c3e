use crate::error::{Result, StoreError};
use bytes::Bytes;
use reqwest::{Client, Response, header};

pub const DEFAULT_PORT: u16 = 5722;

/// HTTP client for the casket gateway.
///
/// Each call is a single round trip with no retry. Keys are passed and
/// returned in their hex form exactly as the gateway exchanges them.
#[derive(Clone)]
pub struct CasketClient {
    client: Client,
    base_url: String,
}

impl CasketClient {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(StoreError::Config("host cannot be blank".to_string()));
        }

        Ok(Self {
            client: Client::new(),
            base_url: format!("http://{}:{}", host, port),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Store `value`; the response body is the hex key.
    pub async fn put(&self, value: &[u8]) -> Result<Bytes> {
        if value.is_empty() {
            return Err(StoreError::ZeroValue);
        }

        let response = self
            .client
            .post(format!("{}/set", self.base_url))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(value.to_vec())
            .send()
            .await?;
        read_body(response).await
    }

    pub async fn get(&self, key: &str) -> Result<Bytes> {
        self.http_get(&format!("{}/get/{}", self.base_url, key)).await
    }

    pub async fn del(&self, key: &str) -> Result<Bytes> {
        self.http_get(&format!("{}/del/{}", self.base_url, key)).await
    }

    pub async fn info(&self) -> Result<Bytes> {
        self.http_get(&format!("{}/info", self.base_url)).await
    }

    async fn http_get(&self, url: &str) -> Result<Bytes> {
        let response = self.client.get(url).send().await?;
        read_body(response).await
    }
}

async fn read_body(response: Response) -> Result<Bytes> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        return Err(StoreError::Http(format!(
            "{}: {}",
            status,
            String::from_utf8_lossy(&body).trim()
        )));
    }
    Ok(body)
}
