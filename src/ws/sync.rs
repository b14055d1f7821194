//! Reply and update synchronization for one WebSocket connection.
//!
//! A [`MessageSync`] tracks two independent expectations:
//!
//! - the **reply slot**, armed by every send with a fresh latch of one and
//!   released by the first inbound message that answers the sent command;
//! - the **update slot**, armed explicitly with a count `n` and released by
//!   the `n`-th inbound message after arming.
//!
//! Re-arming either slot replaces it atomically, so waiters only ever see the
//! most recent expectation. Every inbound message is offered to both slots,
//! which means one message can satisfy a reply wait and an update wait at the
//! same time.
//!
//! # Reply correlation
//!
//! The reply slot remembers the `cmdId`s of the frame that armed it. A
//! message whose header carries a different id does not release the reply
//! latch, so a late reply to an earlier send cannot satisfy a later wait.
//! Messages without a correlation id are accepted by any reply slot.
//!
//! # Example Usage
//!
//! ```rust
//! use iot_ws_harness::ws::{MessageSync, Strictness, WaitOutcome};
//! use std::time::Duration;
//!
//! # async fn example() -> iot_ws_harness::HarnessResult<()> {
//! let sync = MessageSync::new();
//! sync.arm_reply(vec![1]);
//! sync.arm_update(1)?;
//!
//! sync.on_message(r#"{"cmdId":1,"count":101}"#.to_string());
//!
//! let reply = sync.wait_for_reply(Duration::from_secs(1), Strictness::Strict).await?;
//! let update = sync.wait_for_update(Duration::from_secs(1), Strictness::Strict).await?;
//! assert_eq!(reply, update);
//! # Ok(())
//! # }
//! ```

use super::latch::CountDownLatch;
use crate::codec::{self, ReplyHeader};
use crate::error::{HarnessError, HarnessResult};
use log::{debug, trace, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

/// What to do when a wait expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Expiry is an error.
    #[default]
    Strict,
    /// Expiry is reported as [`WaitOutcome::TimedOut`].
    Lenient,
}

/// Result of a completed wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The latch released; carries the message that released it.
    Received(String),
    /// The deadline passed first.
    TimedOut,
}

impl WaitOutcome {
    pub fn message(&self) -> Option<&str> {
        match self {
            WaitOutcome::Received(message) => Some(message),
            WaitOutcome::TimedOut => None,
        }
    }

    pub fn into_message(self) -> Option<String> {
        match self {
            WaitOutcome::Received(message) => Some(message),
            WaitOutcome::TimedOut => None,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, WaitOutcome::TimedOut)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConnectionState {
    Open,
    Lost(String),
}

/// One armed expectation.
#[derive(Debug)]
struct Slot {
    latch: CountDownLatch,
    // Empty accepts every message.
    expected_ids: Vec<i32>,
    message: Mutex<Option<String>>,
}

impl Slot {
    fn new(count: usize, expected_ids: Vec<i32>) -> Arc<Self> {
        Arc::new(Self {
            latch: CountDownLatch::new(count),
            expected_ids,
            message: Mutex::new(None),
        })
    }

    fn accepts(&self, header: Option<&ReplyHeader>) -> bool {
        if self.expected_ids.is_empty() {
            return true;
        }
        match header.and_then(ReplyHeader::correlation_id) {
            Some(id) => self.expected_ids.contains(&id),
            None => true,
        }
    }

    /// Record `text` and count down. Returns true if this released the latch.
    fn offer(&self, text: &str) -> bool {
        if self.latch.is_released() {
            return false;
        }
        *lock(&self.message) = Some(text.to_string());
        self.latch.count_down() == 0
    }

    fn taken_message(&self) -> String {
        lock(&self.message).clone().unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct SyncState {
    reply: Option<Arc<Slot>>,
    update: Option<Arc<Slot>>,
    last_message: Option<String>,
}

#[derive(Clone, Copy)]
enum SlotKind {
    Reply,
    Update,
}

impl SlotKind {
    fn operation(self) -> &'static str {
        match self {
            SlotKind::Reply => "reply",
            SlotKind::Update => "update",
        }
    }
}

/// Reply/update latches for one connection.
#[derive(Debug)]
pub struct MessageSync {
    state: Mutex<SyncState>,
    connection: watch::Sender<ConnectionState>,
}

impl Default for MessageSync {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageSync {
    pub fn new() -> Self {
        let (connection, _) = watch::channel(ConnectionState::Open);
        Self {
            state: Mutex::new(SyncState::default()),
            connection,
        }
    }

    /// Replace the reply slot with a fresh latch of one.
    ///
    /// Must be called before the frame is transmitted, so the reply cannot
    /// arrive ahead of the latch that waits for it.
    pub fn arm_reply(&self, expected_ids: Vec<i32>) {
        trace!("Arming reply latch for cmdIds {:?}", expected_ids);
        lock(&self.state).reply = Some(Slot::new(1, expected_ids));
    }

    /// Replace the update slot with a fresh latch of `count` and forget the
    /// last observed message.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a zero count.
    pub fn arm_update(&self, count: usize) -> HarnessResult<()> {
        if count == 0 {
            return Err(HarnessError::invalid_argument(
                "update count must be positive",
            ));
        }
        trace!("Arming update latch for {} messages", count);
        let mut state = lock(&self.state);
        state.update = Some(Slot::new(count, Vec::new()));
        state.last_message = None;
        Ok(())
    }

    /// Feed one inbound message to both slots.
    pub fn on_message(&self, text: String) {
        let header = codec::decode_header(&text);
        let mut state = lock(&self.state);

        if let Some(reply) = &state.reply {
            if reply.accepts(header.as_ref()) {
                if reply.offer(&text) {
                    trace!("Reply latch released");
                }
            } else {
                debug!(
                    "Ignoring message for cmdId {:?} while awaiting {:?}",
                    header.and_then(|h| h.correlation_id()),
                    reply.expected_ids
                );
            }
        }
        if let Some(update) = &state.update {
            if update.offer(&text) {
                trace!("Update latch released");
            }
        }
        state.last_message = Some(text);
    }

    /// Record that the connection is gone and wake every waiter.
    pub fn on_connection_lost(&self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Connection lost: {}", reason);
        self.connection.send_if_modified(|state| {
            if *state == ConnectionState::Open {
                *state = ConnectionState::Lost(reason);
                true
            } else {
                false
            }
        });
    }

    pub fn is_connected(&self) -> bool {
        *self.connection.borrow() == ConnectionState::Open
    }

    /// The most recently observed message, if any since the last update arm.
    pub fn last_message(&self) -> Option<String> {
        lock(&self.state).last_message.clone()
    }

    /// Wait for the reply to the most recent send.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a zero timeout or when nothing was sent
    /// - `Connection` when the connection drops before the reply arrives
    /// - `Timeout` when `strictness` is [`Strictness::Strict`] and the deadline passes
    pub async fn wait_for_reply(
        &self,
        timeout: Duration,
        strictness: Strictness,
    ) -> HarnessResult<WaitOutcome> {
        self.wait(SlotKind::Reply, timeout, strictness).await
    }

    /// Wait for the update count armed by [`MessageSync::arm_update`].
    ///
    /// Errors as [`MessageSync::wait_for_reply`].
    pub async fn wait_for_update(
        &self,
        timeout: Duration,
        strictness: Strictness,
    ) -> HarnessResult<WaitOutcome> {
        self.wait(SlotKind::Update, timeout, strictness).await
    }

    async fn wait(
        &self,
        kind: SlotKind,
        timeout: Duration,
        strictness: Strictness,
    ) -> HarnessResult<WaitOutcome> {
        if timeout.is_zero() {
            return Err(HarnessError::invalid_argument("timeout must be positive"));
        }
        let slot = {
            let state = lock(&self.state);
            match kind {
                SlotKind::Reply => state.reply.clone(),
                SlotKind::Update => state.update.clone(),
            }
        }
        .ok_or_else(|| {
            HarnessError::invalid_argument(format!(
                "no {} expectation is armed",
                kind.operation()
            ))
        })?;

        let mut connection = self.connection.subscribe();
        let released = tokio::select! {
            biased;
            released = slot.latch.wait(timeout) => released,
            lost = connection.wait_for(|state| *state != ConnectionState::Open) => {
                if slot.latch.is_released() {
                    true
                } else {
                    let reason = match lost.as_deref() {
                        Ok(ConnectionState::Lost(reason)) => reason.clone(),
                        _ => "connection closed".to_string(),
                    };
                    return Err(HarnessError::connection(reason));
                }
            }
        };

        if released {
            return Ok(WaitOutcome::Received(slot.taken_message()));
        }
        debug!(
            "No {} within {:?} ({} outstanding)",
            kind.operation(),
            timeout,
            slot.latch.count()
        );
        match strictness {
            Strictness::Strict => Err(HarnessError::timeout(kind.operation(), timeout)),
            Strictness::Lenient => Ok(WaitOutcome::TimedOut),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
