//! WebSocket session, synchronization and command helpers.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use iot_ws_harness::HarnessConfig;
//! use iot_ws_harness::codec::{EntityFilter, EntityType};
//! use iot_ws_harness::ws::WsClient;
//!
//! # async fn example(token: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarnessConfig::default();
//! let client = WsClient::connect(&config, Some(token)).await?;
//!
//! let reply = client
//!     .send_entity_count(EntityFilter::of_type(EntityType::Tenant), Vec::new())
//!     .await?;
//! println!("{} tenants", reply.count);
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod builders;
pub mod client;
pub mod latch;
pub mod sync;

pub use builders::CMD_ID;
pub use client::WsClient;
pub use latch::CountDownLatch;
pub use sync::{MessageSync, Strictness, WaitOutcome};
