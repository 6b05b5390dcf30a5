//! HTTP peer getter

use crate::common::utils::encode_segment;
use crate::group::peers::{FetchRequest, FetchResponse, PeerGetter};
use crate::{Error, Result};
use async_trait::async_trait;

/// Fetches values from one peer over its HTTP peer protocol
pub struct HttpGetter {
    /// Peer address joined with the base path, e.g. `http://10.0.0.2:8008/_ringcache/`
    base_url: String,
    client: reqwest::Client,
}

impl HttpGetter {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    pub fn url_for(&self, req: &FetchRequest) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            encode_segment(&req.group),
            encode_segment(&req.key)
        )
    }
}

#[async_trait]
impl PeerGetter for HttpGetter {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let url = self.url_for(req);
        let res = self.client.get(&url).send().await?;

        let status = res.status();
        let body = res
            .bytes()
            .await
            .map_err(|e| Error::Peer(format!("read response body error: {}", e)))?;

        if status != reqwest::StatusCode::OK {
            return Err(Error::Peer(format!(
                "server returned status: {} - message: {}",
                status,
                String::from_utf8_lossy(&body)
            )));
        }

        Ok(FetchResponse {
            value: body.to_vec(),
        })
    }
}
