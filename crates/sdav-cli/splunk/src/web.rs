use std::time::Duration;

use reqwest::StatusCode;
use sdav_core::error::SdavError;
use sdav_core::probe::{Probe, ProbeClassification, ProbeResult};

use crate::{TransportFailure, classify};

/// Blocking GET against a node's web interface, expecting a 200.
pub struct WebInterfaceProbe {
    client: reqwest::blocking::Client,
    url: String,
}

impl WebInterfaceProbe {
    pub fn new(url: impl Into<String>, attempt_timeout: Duration) -> Result<Self, SdavError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(attempt_timeout)
            .connect_timeout(attempt_timeout)
            .build()
            .map_err(|e| SdavError::Http(format!("Failed to build probe client: {}", e)))?;

        Ok(WebInterfaceProbe { client, url: url.into() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Probe for WebInterfaceProbe {
    fn check(&self) -> ProbeResult {
        match self.client.get(&self.url).send() {
            Ok(response) if response.status() == StatusCode::OK => ProbeResult::ok(),
            Ok(response) => {
                let status = response.status().as_u16();
                ProbeResult::failed(ProbeClassification::UnexpectedStatus(status))
            }
            Err(e) => {
                let classification = match classify(&e) {
                    TransportFailure::Timeout => ProbeClassification::Timeout,
                    TransportFailure::Refused => ProbeClassification::ConnectionRefused,
                    TransportFailure::Other => ProbeClassification::Other(e.to_string()),
                };
                ProbeResult::failed(classification)
            }
        }
    }
}
