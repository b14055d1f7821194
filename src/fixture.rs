//! Per-test context: REST session plus lazily opened WebSocket connections.
//!
//! A [`TestContext`] belongs to exactly one test. The first call to
//! [`TestContext::ws_client`] opens a connection authenticated with whatever
//! token the REST session holds at that moment; every later call returns the
//! same connection. [`TestContext::another_ws_client`] does the same for a
//! second, independent connection, so multi-session tests can hold both at
//! once. [`TestContext::teardown`] closes everything the context opened.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use iot_ws_harness::{HarnessConfig, TestContext};
//! use iot_ws_harness::codec::{EntityFilter, EntityType};
//!
//! # async fn example() -> iot_ws_harness::HarnessResult<()> {
//! let mut ctx = TestContext::new(HarnessConfig::default())?;
//! ctx.login_sys_admin().await?;
//!
//! let reply = ctx
//!     .ws_client()
//!     .await?
//!     .send_entity_count(EntityFilter::of_type(EntityType::Tenant), Vec::new())
//!     .await?;
//! assert_eq!(reply.cmd_id, 1);
//!
//! ctx.teardown().await;
//! # Ok(())
//! # }
//! ```

use crate::config::{Actor, HarnessConfig};
use crate::error::HarnessResult;
use crate::rest::{JwtPair, RestClient};
use crate::ws::WsClient;
use log::debug;
use tokio::sync::OnceCell;

pub struct TestContext {
    config: HarnessConfig,
    rest: RestClient,
    ws: OnceCell<WsClient>,
    another: OnceCell<WsClient>,
}

impl TestContext {
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        let rest = RestClient::new(&config)?;
        Ok(Self {
            config,
            rest,
            ws: OnceCell::new(),
            another: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub fn rest_mut(&mut self) -> &mut RestClient {
        &mut self.rest
    }

    /// Log in as one of the configured actors.
    pub async fn login(&mut self, actor: Actor) -> HarnessResult<&JwtPair> {
        let credentials = self.config.credentials(actor).clone();
        self.rest.login_as(&credentials).await
    }

    pub async fn login_sys_admin(&mut self) -> HarnessResult<&JwtPair> {
        self.login(Actor::SysAdmin).await
    }

    pub async fn login_tenant_admin(&mut self) -> HarnessResult<&JwtPair> {
        self.login(Actor::TenantAdmin).await
    }

    pub async fn login_customer_user(&mut self) -> HarnessResult<&JwtPair> {
        self.login(Actor::CustomerUser).await
    }

    /// The shared connection, opened on first use.
    pub async fn ws_client(&self) -> HarnessResult<&WsClient> {
        self.ws
            .get_or_try_init(|| async {
                debug!("Opening shared WebSocket connection");
                WsClient::connect(&self.config, self.rest.token()).await
            })
            .await
    }

    /// Whether the shared connection has been opened.
    pub fn has_ws_client(&self) -> bool {
        self.ws.initialized()
    }

    /// A second connection, independent of [`TestContext::ws_client`],
    /// opened on first use with the token the REST session holds at that
    /// moment.
    pub async fn another_ws_client(&self) -> HarnessResult<&WsClient> {
        self.another
            .get_or_try_init(|| async {
                debug!("Opening second WebSocket connection");
                WsClient::connect(&self.config, self.rest.token()).await
            })
            .await
    }

    pub fn has_another_ws_client(&self) -> bool {
        self.another.initialized()
    }

    /// Close every connection this context opened.
    pub async fn teardown(mut self) {
        for cell in [&mut self.ws, &mut self.another] {
            if let Some(client) = cell.take() {
                client.close().await;
            }
        }
    }
}

impl std::fmt::Debug for TestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContext")
            .field("base_url", &self.config.base_url)
            .field("logged_in", &self.rest.token().is_some())
            .field("ws_connected", &self.has_ws_client())
            .field("another_connected", &self.has_another_ws_client())
            .finish()
    }
}
