//! HTTP metadata source for the kernel view-model endpoint.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE, ORIGIN, REFERER, USER_AGENT};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::config::MetadataConfig;
use crate::error::{FetchError, FetchResult};
use crate::traits::metadata::MetadataSource;
use crate::types::work::KernelRef;

/// Identifying body of a view-model request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelViewRequest<'a> {
    pub author_user_name: &'a str,
    pub kernel_slug: &'a str,
    /// 0 selects the latest version
    pub kernel_version_id: u64,
}

impl<'a> KernelViewRequest<'a> {
    pub fn latest(key: &'a KernelRef) -> Self {
        Self {
            author_user_name: key.author(),
            kernel_slug: key.slug(),
            kernel_version_id: 0,
        }
    }
}

/// POSTs view-model requests with the configured session headers.
pub struct HttpMetadataSource {
    client: reqwest::Client,
    endpoint: String,
}

fn header_value(name: &str, value: &str) -> FetchResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| FetchError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

impl HttpMetadataSource {
    /// Build the client. `timeout` bounds every request.
    pub fn new(config: &MetadataConfig, timeout: Duration) -> FetchResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ORIGIN, header_value("origin", &config.origin)?);
        headers.insert(REFERER, header_value("referer", &config.referer)?);
        headers.insert(USER_AGENT, header_value("user-agent", &config.user_agent)?);

        let credentials = &config.credentials;
        if let Some(cookie) = &credentials.cookie {
            let mut value = header_value("cookie", cookie.expose())?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }
        if let Some(token) = &credentials.xsrf_token {
            let mut value = header_value("x-xsrf-token", token.expose())?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static("x-xsrf-token"), value);
        }
        if let Some(version) = &credentials.build_version {
            headers.insert(
                HeaderName::from_static("x-kaggle-build-version"),
                header_value("x-kaggle-build-version", version)?,
            );
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MetadataSource for HttpMetadataSource {
    async fn fetch_once(&self, key: &KernelRef) -> FetchResult<serde_json::Value> {
        debug!(key = %key, "Requesting kernel view model");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&KernelViewRequest::latest(key))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::SessionCredentials;

    #[test]
    fn test_request_body_shape() {
        let key = KernelRef::new("alice", "titanic-eda");
        let body = serde_json::to_value(KernelViewRequest::latest(&key)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "authorUserName": "alice",
                "kernelSlug": "titanic-eda",
                "kernelVersionId": 0
            })
        );
    }

    #[test]
    fn test_builds_with_credentials() {
        let config = MetadataConfig {
            credentials: SessionCredentials::new()
                .with_cookie("ka_sessionid=abc")
                .with_xsrf_token("token")
                .with_build_version("9ce5d950"),
            ..MetadataConfig::default()
        };
        let source = HttpMetadataSource::new(&config, Duration::from_secs(10)).unwrap();
        assert_eq!(source.endpoint(), config.endpoint);
    }

    #[test]
    fn test_rejects_invalid_header() {
        let config = MetadataConfig {
            credentials: SessionCredentials::new().with_cookie("bad\nvalue"),
            ..MetadataConfig::default()
        };
        assert!(matches!(
            HttpMetadataSource::new(&config, Duration::from_secs(10)),
            Err(FetchError::InvalidHeader { .. })
        ));
    }
}
