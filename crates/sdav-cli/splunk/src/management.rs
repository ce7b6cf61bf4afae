use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use sdav_core::StatusSource;
use sdav_core::error::{QueryError, SdavError};
use sdav_core::settings::ManagementSettings;

use crate::{TransportFailure, classify};

const SERVER_INFO_PATH: &str = "services/server/info";
const REST_NS: &str = "http://dev.splunk.com/ns/rest";

/// Client for the Splunk management port of every node.
pub struct ManagementClient {
    client: reqwest::Client,
    scheme: String,
    port: u16,
    authorization: String,
}

impl ManagementClient {
    pub fn new(settings: &ManagementSettings) -> Result<Self, SdavError> {
        if settings.accept_invalid_certs {
            tracing::debug!("TLS certificate verification disabled for management queries");
        }

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| SdavError::Http(format!("Failed to build management client: {}", e)))?;

        Ok(ManagementClient {
            client,
            scheme: settings.scheme.clone(),
            port: settings.port,
            authorization: settings.authorization.clone(),
        })
    }

    fn server_info_url(&self, ip: &str) -> String {
        format!("{}://{}:{}/{}", self.scheme, ip, self.port, SERVER_INFO_PATH)
    }
}

#[async_trait]
impl StatusSource for ManagementClient {
    async fn server_version(&self, ip: &str) -> Result<String, QueryError> {
        let response = self
            .client
            .get(self.server_info_url(ip))
            .header(AUTHORIZATION, &self.authorization)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(QueryError::Other(format!("API Error ({})", response.status())));
        }

        let body = response.text().await.map_err(transport_error)?;
        parse_version(&body)
    }
}

fn transport_error(err: reqwest::Error) -> QueryError {
    match classify(&err) {
        TransportFailure::Timeout => QueryError::Timeout,
        TransportFailure::Refused => QueryError::ConnectionRefused,
        TransportFailure::Other => QueryError::Other(format!("Request failed: {}", err)),
    }
}

/// Pull the `<s:key name="version">` value out of a `server/info` feed.
pub fn parse_version(body: &str) -> Result<String, QueryError> {
    let doc = roxmltree::Document::parse(body)
        .map_err(|e| QueryError::Other(format!("Failed to parse response: {}", e)))?;

    doc.descendants()
        .find(|node| {
            node.has_tag_name((REST_NS, "key")) && node.attribute("name") == Some("version")
        })
        .and_then(|node| node.text())
        .map(|text| text.trim().to_string())
        .filter(|version| !version.is_empty())
        .ok_or_else(|| QueryError::Other("No version key in server info".to_string()))
}
