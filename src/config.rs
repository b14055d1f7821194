//! Harness configuration and its builder.
//!
//! The configuration names the platform endpoint, how the WebSocket session is
//! authenticated, the wait deadlines and the credentials of the three standard
//! actors (system administrator, tenant administrator, customer user).

use crate::error::{BuildError, BuildResult, HarnessResult};
use crate::page::PageLink;
use reqwest::Url;
use std::time::Duration;

/// Default deadline for `wait_for_reply` / `wait_for_update`.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default deadline for opening the WebSocket.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Login credentials for one actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// The standard actors every test context can log in as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actor {
    SysAdmin,
    TenantAdmin,
    CustomerUser,
}

/// Configuration for REST and WebSocket access to the platform.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Base HTTP URL of the platform, e.g. `http://localhost:8080`.
    pub base_url: String,

    /// Path of the WebSocket endpoint. Defaults to `/api/ws`.
    pub ws_path: String,

    /// Pass the token as `?token=` instead of sending an auth command
    /// as the first frame.
    pub token_in_url: bool,

    pub reply_timeout: Duration,
    pub update_timeout: Duration,
    pub connect_timeout: Duration,

    /// Page size used when a caller does not pick one.
    pub default_page_size: usize,

    pub sys_admin: Credentials,
    pub tenant_admin: Credentials,
    pub customer_user: Credentials,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            ws_path: "/api/ws".to_string(),
            token_in_url: false,
            reply_timeout: DEFAULT_WAIT_TIMEOUT,
            update_timeout: DEFAULT_WAIT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            default_page_size: 10,
            sys_admin: Credentials::new("sysadmin@thingsboard.org", "sysadmin"),
            tenant_admin: Credentials::new("tenant@thingsboard.org", "tenant"),
            customer_user: Credentials::new("customer@thingsboard.org", "customer"),
        }
    }
}

impl HarnessConfig {
    /// Start a builder from the default configuration.
    pub fn builder() -> HarnessConfigBuilder {
        HarnessConfigBuilder::new()
    }

    /// Load overrides from `IOT_HARNESS_*` environment variables.
    pub fn from_env() -> BuildResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load overrides through an arbitrary lookup function.
    ///
    /// Recognized keys: `IOT_HARNESS_BASE_URL`, `IOT_HARNESS_WS_PATH`,
    /// `IOT_HARNESS_TOKEN_IN_URL`, `IOT_HARNESS_REPLY_TIMEOUT_MS`,
    /// `IOT_HARNESS_UPDATE_TIMEOUT_MS`, `IOT_HARNESS_PAGE_SIZE`.
    pub fn from_lookup<F>(lookup: F) -> BuildResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = HarnessConfigBuilder::new();

        if let Some(url) = lookup("IOT_HARNESS_BASE_URL") {
            builder = builder.with_base_url(url);
        }
        if let Some(path) = lookup("IOT_HARNESS_WS_PATH") {
            builder = builder.with_ws_path(path);
        }
        if let Some(flag) = lookup("IOT_HARNESS_TOKEN_IN_URL") {
            builder = builder.with_token_in_url(parse_flag("IOT_HARNESS_TOKEN_IN_URL", &flag)?);
        }
        if let Some(ms) = lookup("IOT_HARNESS_REPLY_TIMEOUT_MS") {
            builder = builder.with_reply_timeout(parse_millis("IOT_HARNESS_REPLY_TIMEOUT_MS", &ms)?);
        }
        if let Some(ms) = lookup("IOT_HARNESS_UPDATE_TIMEOUT_MS") {
            builder =
                builder.with_update_timeout(parse_millis("IOT_HARNESS_UPDATE_TIMEOUT_MS", &ms)?);
        }
        if let Some(size) = lookup("IOT_HARNESS_PAGE_SIZE") {
            let size = size.trim().parse::<usize>().map_err(|_| {
                BuildError::invalid(format!("IOT_HARNESS_PAGE_SIZE is not a number: {}", size))
            })?;
            builder = builder.with_default_page_size(size);
        }

        builder.build()
    }

    /// Credentials configured for an actor.
    pub fn credentials(&self, actor: Actor) -> &Credentials {
        match actor {
            Actor::SysAdmin => &self.sys_admin,
            Actor::TenantAdmin => &self.tenant_admin,
            Actor::CustomerUser => &self.customer_user,
        }
    }

    /// Absolute HTTP URL for an API path.
    pub fn http_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// WebSocket URL derived from the base URL.
    ///
    /// `http` maps to `ws` and `https` to `wss`. `ws_path` is appended to any
    /// path already present in the base URL. The token is appended as a query
    /// parameter only when `token_in_url` is set.
    pub fn ws_url(&self, token: Option<&str>) -> BuildResult<String> {
        let base = Url::parse(self.base_url.trim()).map_err(|e| {
            BuildError::invalid(format!("Invalid base_url '{}': {}", self.base_url, e))
        })?;

        let scheme = match base.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(BuildError::invalid(format!(
                    "Unsupported base_url scheme '{}'; expected http(s)",
                    other
                )));
            }
        };

        let path = format!("{}{}", base.path().trim_end_matches('/'), self.ws_path);
        let mut ws = base.clone();
        ws.set_scheme(scheme)
            .map_err(|_| BuildError::invalid("Failed to set WebSocket URL scheme"))?;
        ws.set_path(&path);
        ws.set_query(None);
        ws.set_fragment(None);

        if self.token_in_url {
            if let Some(token) = token {
                ws.query_pairs_mut().append_pair("token", token);
            }
        }

        Ok(ws.to_string())
    }

    /// Link to the first page at the configured default page size.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `default_page_size` was set to zero after
    /// the configuration was built.
    pub fn first_page_link(&self) -> HarnessResult<PageLink> {
        PageLink::new(self.default_page_size)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> BuildResult<()> {
        if self.base_url.is_empty() {
            return Err(BuildError::invalid("Base URL cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(BuildError::invalid("Base URL must start with http:// or https://"));
        }

        if !self.ws_path.starts_with('/') {
            return Err(BuildError::invalid("WebSocket path must start with '/'"));
        }

        if self.reply_timeout.is_zero()
            || self.update_timeout.is_zero()
            || self.connect_timeout.is_zero()
        {
            return Err(BuildError::invalid("Timeouts must be positive"));
        }

        if self.default_page_size == 0 {
            return Err(BuildError::invalid("Default page size must be positive"));
        }

        Ok(())
    }
}

fn parse_millis(key: &str, value: &str) -> BuildResult<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| BuildError::invalid(format!("{} is not a number of milliseconds: {}", key, value)))
}

fn parse_flag(key: &str, value: &str) -> BuildResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(BuildError::invalid(format!("{} is not a boolean: {}", key, value))),
    }
}

/// Builder for [`HarnessConfig`].
///
/// # Examples
///
/// ```rust
/// use iot_ws_harness::HarnessConfig;
/// use std::time::Duration;
///
/// let config = HarnessConfig::builder()
///     .with_base_url("http://localhost:9090")
///     .with_reply_timeout(Duration::from_secs(5))
///     .build()
///     .unwrap();
/// assert_eq!(config.ws_url(None).unwrap(), "ws://localhost:9090/api/ws");
/// ```
#[derive(Debug, Clone, Default)]
pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn with_ws_path(mut self, ws_path: impl Into<String>) -> Self {
        self.config.ws_path = ws_path.into();
        self
    }

    pub fn with_token_in_url(mut self, token_in_url: bool) -> Self {
        self.config.token_in_url = token_in_url;
        self
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.config.reply_timeout = timeout;
        self
    }

    pub fn with_update_timeout(mut self, timeout: Duration) -> Self {
        self.config.update_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn with_default_page_size(mut self, page_size: usize) -> Self {
        self.config.default_page_size = page_size;
        self
    }

    /// Override the credentials of one actor.
    pub fn with_credentials(mut self, actor: Actor, credentials: Credentials) -> Self {
        match actor {
            Actor::SysAdmin => self.config.sys_admin = credentials,
            Actor::TenantAdmin => self.config.tenant_admin = credentials,
            Actor::CustomerUser => self.config.customer_user = credentials,
        }
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> BuildResult<HarnessConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
