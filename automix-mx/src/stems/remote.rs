//! Remote stem separator client
//!
//! Talks to a deployed AI separator over HTTP: a health probe decides
//! availability (3 s deadline), then one request per stem (300 s
//! deadline each). A stem that fails is simply absent from the result -
//! partial sets are valid completions.

use super::{StemEngine, StemPayload};
use crate::db::stems::StemKind;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Health probe deadline
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Per-stem separation deadline
const SEPARATE_TIMEOUT: Duration = Duration::from_secs(300);

/// HTTP client for a remote separation service
pub struct RemoteStemEngine {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteStemEngine {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| Error::Stem(format!("building http client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl StemEngine for RemoteStemEngine {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "remote separator health probe failed");
                false
            }
        }
    }

    async fn separate(
        &self,
        bytes: &[u8],
        mime: &str,
        name: &str,
    ) -> Result<HashMap<StemKind, StemPayload>> {
        let mut stems = HashMap::new();
        for kind in StemKind::all() {
            let url = format!("{}/separate", self.base_url);
            let response = self
                .client
                .post(&url)
                .query(&[("stem", kind.as_str()), ("name", name)])
                .header(reqwest::header::CONTENT_TYPE, mime)
                .body(bytes.to_vec())
                .timeout(SEPARATE_TIMEOUT)
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => {
                    let stem_mime = response
                        .headers()
                        .get(reqwest::header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("audio/wav")
                        .to_string();
                    match response.bytes().await {
                        Ok(body) if !body.is_empty() => {
                            stems.insert(
                                *kind,
                                StemPayload {
                                    bytes: body.to_vec(),
                                    mime: stem_mime,
                                },
                            );
                        }
                        Ok(_) => {
                            warn!(stem = kind.as_str(), "remote separator returned empty stem");
                        }
                        Err(e) => {
                            warn!(stem = kind.as_str(), error = %e, "reading remote stem failed");
                        }
                    }
                }
                Ok(response) => {
                    warn!(
                        stem = kind.as_str(),
                        status = %response.status(),
                        "remote separator rejected stem request"
                    );
                }
                Err(e) => {
                    warn!(stem = kind.as_str(), error = %e, "remote separator request failed");
                }
            }
        }

        if stems.is_empty() {
            return Err(Error::Stem("remote separator produced no stems".into()));
        }
        Ok(stems)
    }
}
