//! HTTP-backed adapters: the URL account resolver and the activation
//! token fetcher.

use crate::config::AuthConfig;
use crate::ports::outbound::{AccountResolver, ActivationFetcher, ResolverError};
use async_trait::async_trait;
use murmur_keys::PublicId;
use reqwest::{Client, StatusCode};
use tracing::debug;

fn build_client(config: &AuthConfig) -> Result<Client, ResolverError> {
    let timeout = config.resolver_timeout();
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .map_err(|e| ResolverError::Unavailable(e.to_string()))
}

/// Network-backed account resolver fetching claims from a templated URL.
///
/// The template either contains a `{}` placeholder for the account
/// identifier or the identifier is appended as a path segment.
pub struct UrlResolver {
    client: Client,
    url_template: String,
}

impl UrlResolver {
    pub fn new(url_template: impl Into<String>, config: &AuthConfig) -> Result<Self, ResolverError> {
        Ok(Self {
            client: build_client(config)?,
            url_template: url_template.into(),
        })
    }

    fn url_for(&self, account: &PublicId) -> String {
        let id = account.to_string();
        if self.url_template.contains("{}") {
            self.url_template.replace("{}", &id)
        } else {
            format!("{}/{id}", self.url_template.trim_end_matches('/'))
        }
    }
}

#[async_trait]
impl AccountResolver for UrlResolver {
    async fn fetch(&self, account: &PublicId) -> Result<Option<String>, ResolverError> {
        let url = self.url_for(account);
        debug!(%account, %url, "fetching account claims");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ResolverError::Unavailable(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|e| ResolverError::Unavailable(e.to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|e| ResolverError::Unavailable(e.to_string()))?;
        Ok(Some(body))
    }

    async fn store(&self, _account: &PublicId, _claims: String) -> Result<(), ResolverError> {
        Err(ResolverError::Unsupported)
    }
}

/// Plain HTTP GET fetcher for activation tokens named by URL in an
/// import; the response body is treated verbatim as the envelope.
pub struct HttpActivationFetcher {
    client: Client,
}

impl HttpActivationFetcher {
    pub fn new(config: &AuthConfig) -> Result<Self, ResolverError> {
        Ok(Self {
            client: build_client(config)?,
        })
    }
}

#[async_trait]
impl ActivationFetcher for HttpActivationFetcher {
    async fn fetch_token(&self, url: &str) -> Result<String, ResolverError> {
        debug!(%url, "fetching activation token");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ResolverError::Unavailable(e.to_string()))?;
        response
            .text()
            .await
            .map_err(|e| ResolverError::Unavailable(e.to_string()))
    }
}
