//! HTTP client wrapper - login and current-user requests

use std::future::Future;
use std::time::Duration;

use crate::config::Config;
use crate::constants::{LOGIN_PATH, ME_PATH};
use crate::error::ApiError;
use crate::models::{Credentials, ErrorBody, TokenResponse, User};

/// Remote authentication API
pub trait AuthApi {
    /// Exchange credentials for a bearer token
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<TokenResponse, ApiError>> + Send;

    /// Fetch the account the token belongs to
    fn current_user(&self, token: &str) -> impl Future<Output = Result<User, ApiError>> + Send;
}

/// `AuthApi` over HTTP
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        HttpAuthApi {
            client: create_client(timeout),
            base_url,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_base_url.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Turn a non-2xx response into `ApiError::Rejected`, reading `detail` best-effort
async fn rejection(resp: reqwest::Response) -> ApiError {
    let status = resp.status().as_u16();
    let detail = match resp.text().await {
        Ok(body) => ErrorBody::detail_from(&body),
        Err(e) => {
            tracing::debug!(status, error = %e, "Error reading rejection body");
            None
        }
    };
    ApiError::Rejected { status, detail }
}

impl AuthApi for HttpAuthApi {
    async fn login(&self, credentials: &Credentials) -> Result<TokenResponse, ApiError> {
        let url = self.url(LOGIN_PATH);
        tracing::debug!(url = %url, username = %credentials.username, "Submitting credentials");

        let resp = self.client.post(&url).form(credentials).send().await?;
        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }
        Ok(resp.json::<TokenResponse>().await?)
    }

    async fn current_user(&self, token: &str) -> Result<User, ApiError> {
        let url = self.url(ME_PATH);
        tracing::debug!(url = %url, "Fetching current user");

        let resp = self.client.get(&url).bearer_auth(token).send().await?;
        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }
        Ok(resp.json::<User>().await?)
    }
}

/// Create an HTTP client with the given request deadline
pub fn create_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
