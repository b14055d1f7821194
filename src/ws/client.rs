//! WebSocket connection to the telemetry endpoint.
//!
//! A [`WsClient`] owns one socket. Writes go through the client; a spawned
//! reader task feeds every inbound text frame to the connection's
//! [`MessageSync`] and reports closure or read errors to it, so pending waits
//! fail fast instead of running into their deadline.

use super::sync::{MessageSync, Strictness, WaitOutcome};
use crate::codec::{self, WsCmd, WsCommandsWrapper};
use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, trace, warn};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An authenticated WebSocket session.
pub struct WsClient {
    sink: Mutex<SplitSink<WsStream, Message>>,
    sync: Arc<MessageSync>,
    reader: JoinHandle<()>,
    reply_timeout: Duration,
    update_timeout: Duration,
}

impl WsClient {
    /// Open a connection and authenticate it.
    ///
    /// With `token_in_url` the token travels as a query parameter; otherwise
    /// an `authCmd` frame is the first frame written. A `None` token opens an
    /// anonymous session.
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the socket cannot be opened within the
    /// configured connect timeout.
    pub async fn connect(config: &HarnessConfig, token: Option<&str>) -> HarnessResult<Self> {
        let url = config
            .ws_url(token)
            .map_err(|e| HarnessError::invalid_argument(e.to_string()))?;
        info!(
            "Opening WebSocket session to {} (token in URL: {})",
            config.ws_path, config.token_in_url
        );

        let (stream, _response) = tokio::time::timeout(config.connect_timeout, connect_async(url))
            .await
            .map_err(|_| {
                HarnessError::connection(format!(
                    "connect timed out after {:?}",
                    config.connect_timeout
                ))
            })?
            .map_err(|e| HarnessError::connection(format!("connect failed: {}", e)))?;

        let (sink, source) = stream.split();
        let sync = Arc::new(MessageSync::new());
        let reader = tokio::spawn(read_loop(source, Arc::clone(&sync)));

        let client = Self {
            sink: Mutex::new(sink),
            sync,
            reader,
            reply_timeout: config.reply_timeout,
            update_timeout: config.update_timeout,
        };

        if let Some(token) = token.filter(|_| !config.token_in_url) {
            client
                .transmit(codec::encode(&WsCommandsWrapper::auth(token))?)
                .await?;
            debug!("Auth command sent");
        }
        Ok(client)
    }

    /// Send a command envelope.
    ///
    /// The reply latch is armed with the envelope's command ids before the
    /// frame is written. The call returns once the frame is written.
    pub async fn send(&self, wrapper: &WsCommandsWrapper) -> HarnessResult<()> {
        let text = codec::encode(wrapper)?;
        self.sync.arm_reply(wrapper.cmd_ids());
        self.transmit(text).await
    }

    /// Send a single command.
    pub async fn send_cmd(&self, cmd: impl Into<WsCmd>) -> HarnessResult<()> {
        self.send(&WsCommandsWrapper::single(cmd)).await
    }

    /// Send a pre-encoded frame. Command ids are read back from the text when
    /// it parses as an envelope.
    pub async fn send_text(&self, text: impl Into<String>) -> HarnessResult<()> {
        let text = text.into();
        let expected_ids = codec::decode::<WsCommandsWrapper>(&text)
            .map(|wrapper| wrapper.cmd_ids())
            .unwrap_or_default();
        self.sync.arm_reply(expected_ids);
        self.transmit(text).await
    }

    async fn transmit(&self, text: String) -> HarnessResult<()> {
        if !self.sync.is_connected() {
            return Err(HarnessError::connection("connection is closed"));
        }
        trace!("WS >> {}", text);
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Expect `count` further messages on this connection.
    pub fn register_wait_for_update(&self, count: usize) -> HarnessResult<()> {
        self.sync.arm_update(count)
    }

    /// Wait for the reply to the last send, strictly, with the configured
    /// reply timeout.
    pub async fn wait_for_reply(&self) -> HarnessResult<String> {
        let outcome = self
            .wait_for_reply_with(self.reply_timeout, Strictness::Strict)
            .await?;
        received(outcome, "reply", self.reply_timeout)
    }

    pub async fn wait_for_reply_with(
        &self,
        timeout: Duration,
        strictness: Strictness,
    ) -> HarnessResult<WaitOutcome> {
        self.sync.wait_for_reply(timeout, strictness).await
    }

    /// Wait for the registered updates, strictly, with the configured update
    /// timeout.
    pub async fn wait_for_update(&self) -> HarnessResult<String> {
        let outcome = self
            .wait_for_update_with(self.update_timeout, Strictness::Strict)
            .await?;
        received(outcome, "update", self.update_timeout)
    }

    pub async fn wait_for_update_with(
        &self,
        timeout: Duration,
        strictness: Strictness,
    ) -> HarnessResult<WaitOutcome> {
        self.sync.wait_for_update(timeout, strictness).await
    }

    pub fn last_message(&self) -> Option<String> {
        self.sync.last_message()
    }

    /// The last observed message decoded as `T`, or `None` if nothing arrived
    /// since the last update arm.
    ///
    /// # Errors
    ///
    /// Returns `Deserialization` if the message does not have the shape of `T`.
    pub fn last_message_as<T: DeserializeOwned>(&self) -> HarnessResult<Option<T>> {
        self.last_message()
            .map(|text| codec::decode(&text))
            .transpose()
    }

    pub fn is_connected(&self) -> bool {
        self.sync.is_connected()
    }

    /// Synchronization state of this connection.
    pub fn sync(&self) -> &MessageSync {
        &self.sync
    }

    /// Close the session.
    ///
    /// Sends a close frame if the socket is still writable and stops the
    /// reader. Does not wait for the server's close acknowledgement.
    pub async fn close(&self) {
        {
            let mut sink = self.sink.lock().await;
            if let Err(e) = sink.close().await {
                debug!("Close frame not delivered: {}", e);
            }
        }
        self.reader.abort();
        self.sync.on_connection_lost("closed by client");
        info!("WebSocket session closed");
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl std::fmt::Debug for WsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsClient")
            .field("connected", &self.is_connected())
            .field("reply_timeout", &self.reply_timeout)
            .field("update_timeout", &self.update_timeout)
            .finish()
    }
}

fn received(outcome: WaitOutcome, operation: &'static str, waited: Duration) -> HarnessResult<String> {
    outcome
        .into_message()
        .ok_or_else(|| HarnessError::timeout(operation, waited))
}

async fn read_loop(mut source: SplitStream<WsStream>, sync: Arc<MessageSync>) {
    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                trace!("WS << {}", text);
                sync.on_message(text);
            }
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => sync.on_message(text),
                Err(e) => warn!("Dropping non UTF-8 binary frame: {}", e),
            },
            Ok(Message::Close(frame)) => {
                let reason = match frame {
                    Some(frame) => format!("closed by server ({}): {}", frame.code, frame.reason),
                    None => "closed by server".to_string(),
                };
                sync.on_connection_lost(reason);
                return;
            }
            Ok(_) => {}
            Err(e) => {
                sync.on_connection_lost(format!("read failed: {}", e));
                return;
            }
        }
    }
    sync.on_connection_lost("stream ended");
}
