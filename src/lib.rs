//! Client harness for a multi-tenant IoT platform's REST and WebSocket API.
//!
//! Drives the platform's telemetry subscription channel and paged REST
//! endpoints from tests, with deterministic synchronization on asynchronous
//! replies and exhaustive pagination.
//!
//! # Core Components
//!
//! - [`codec`] - JSON wire types for commands, queries and updates
//! - [`ws::WsClient`] - one WebSocket session with reply and update latches
//! - [`ws::builders`] - typed command builders and send-and-wait helpers
//! - [`page`] - page-link cursors and the drain loop
//! - [`rest::RestClient`] - login, token refresh and paged reads
//! - [`TestContext`] - per-test REST session plus lazily opened connections
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use iot_ws_harness::{HarnessConfig, TestContext};
//! use iot_ws_harness::codec::{EntityFilter, EntityType};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut ctx = TestContext::new(HarnessConfig::from_env()?)?;
//! ctx.login_tenant_admin().await?;
//!
//! let ws = ctx.ws_client().await?;
//! let initial = ws
//!     .send_entity_count(EntityFilter::of_type(EntityType::Device), Vec::new())
//!     .await?;
//! println!("{} devices", initial.count);
//!
//! ws.register_wait_for_update(1)?;
//! // ... create a device through REST, then:
//! let update = ws.wait_for_update().await?;
//! println!("update: {}", update);
//!
//! ctx.teardown().await;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod fixture;
pub mod page;
pub mod rest;
pub mod ws;

// Re-export commonly used types for convenience
pub use config::{Actor, Credentials, HarnessConfig, HarnessConfigBuilder};
pub use error::{BuildError, BuildResult, HarnessError, HarnessResult};
pub use fixture::TestContext;
pub use page::{PageData, PageLink, PageSource, SortOrder, TimePageLink, drain};
pub use rest::RestClient;
pub use ws::{MessageSync, Strictness, WaitOutcome, WsClient};
