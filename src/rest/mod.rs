//! REST client for authentication and paged reads.
//!
//! Only the parts of the REST API a test harness needs are covered: logging
//! in as one of the standard actors, refreshing the session, and reading
//! paged list endpoints. Any other endpoint is reachable through
//! [`RestClient::get_json`] and [`RestClient::post_json`].
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use iot_ws_harness::HarnessConfig;
//! use iot_ws_harness::page::{PageLink, drain};
//! use iot_ws_harness::rest::RestClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarnessConfig::default();
//! let mut rest = RestClient::new(&config)?;
//! rest.login("tenant@thingsboard.org", "tenant").await?;
//!
//! let devices: Vec<serde_json::Value> =
//!     drain(&rest.page_source("/api/tenant/devices"), PageLink::new(23)?).await?;
//! println!("{} devices", devices.len());
//! # Ok(())
//! # }
//! ```

pub mod jwt;
pub mod source;

pub use jwt::{JwtClaims, JwtPair, decode_claims, validate_jwt_subject};
pub use source::RestPageSource;

use crate::codec;
use crate::config::{Credentials, HarnessConfig};
use crate::error::{HarnessError, HarnessResult};
use crate::page::{PageData, PageLink, TimePageLink, drain};
use log::{debug, info};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

const AUTH_HEADER: &str = "X-Authorization";
const LOGIN_PATH: &str = "/api/auth/login";
const REFRESH_PATH: &str = "/api/auth/token";
const LOGOUT_PATH: &str = "/api/auth/logout";

/// HTTP client bound to one base URL and at most one session.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base_url: String,
    default_page_size: usize,
    tokens: Option<JwtPair>,
}

impl RestClient {
    pub fn new(config: &HarnessConfig) -> HarnessResult<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.reply_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_page_size: config.default_page_size,
            tokens: None,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Log in and keep the issued tokens.
    ///
    /// # Errors
    ///
    /// `Authentication` if the server rejects the credentials, `InvalidToken`
    /// if the issued token names a different subject.
    pub async fn login(&mut self, username: &str, password: &str) -> HarnessResult<&JwtPair> {
        let response = self
            .http
            .post(self.url(LOGIN_PATH))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        let pair: JwtPair = read_json(response).await?;
        validate_jwt_subject(&pair.token, username)?;
        info!("Logged in as {}", username);
        Ok(&*self.tokens.insert(pair))
    }

    pub async fn login_as(&mut self, credentials: &Credentials) -> HarnessResult<&JwtPair> {
        self.login(&credentials.username, &credentials.password)
            .await
    }

    /// Exchange the refresh token for a new pair.
    pub async fn refresh_token(&mut self) -> HarnessResult<&JwtPair> {
        let refresh_token = self
            .tokens
            .as_ref()
            .map(|pair| pair.refresh_token.clone())
            .ok_or_else(|| HarnessError::invalid_argument("no session to refresh"))?;
        let response = self
            .http
            .post(self.url(REFRESH_PATH))
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await?;
        let pair: JwtPair = read_json(response).await?;
        debug!("Session token refreshed");
        Ok(&*self.tokens.insert(pair))
    }

    /// End the session. Tokens are dropped even if the server call fails.
    pub async fn logout(&mut self) -> HarnessResult<()> {
        if self.tokens.is_none() {
            return Ok(());
        }
        let request = self.authorized(self.http.post(self.url(LOGOUT_PATH)));
        self.tokens = None;
        let response = request.send().await?;
        check_status(response).await?;
        info!("Logged out");
        Ok(())
    }

    /// Current access token.
    pub fn token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|pair| pair.token.as_str())
    }

    pub fn tokens(&self) -> Option<&JwtPair> {
        self.tokens.as_ref()
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(token) => request.header(AUTH_HEADER, format!("Bearer {}", token)),
            None => request,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> HarnessResult<T> {
        let response = self.authorized(self.http.get(self.url(path))).send().await?;
        read_json(response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> HarnessResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .authorized(self.http.post(self.url(path)))
            .json(body)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn delete(&self, path: &str) -> HarnessResult<()> {
        let response = self
            .authorized(self.http.delete(self.url(path)))
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    /// Fetch one page of a list endpoint.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        link: &PageLink,
    ) -> HarnessResult<PageData<T>> {
        self.get_with_params(path, &link.to_query_params()).await
    }

    /// Fetch one page of a time-bounded list endpoint.
    pub async fn get_time_page<T: DeserializeOwned>(
        &self,
        path: &str,
        link: &TimePageLink,
    ) -> HarnessResult<PageData<T>> {
        self.get_with_params(path, &link.to_query_params()).await
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> HarnessResult<T> {
        let response = self
            .authorized(self.http.get(self.url(path)))
            .query(params)
            .send()
            .await?;
        read_json(response).await
    }

    /// Drain every page of `path` at the configured default page size.
    pub async fn get_all<T>(&self, path: &str) -> HarnessResult<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        let first = PageLink::new(self.default_page_size)?;
        drain(&self.page_source(path), first).await
    }

    /// A [`PageSource`](crate::page::PageSource) over `path`.
    pub fn page_source<T>(&self, path: impl Into<String>) -> RestPageSource<'_, T> {
        RestPageSource::new(self, path)
    }
}

async fn check_status(response: Response) -> HarnessResult<String> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(HarnessError::from_status(status.as_u16(), body))
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> HarnessResult<T> {
    let body = check_status(response).await?;
    codec::decode(&body)
}
