//! Instance console (UART) over WebSocket.
//!
//! The service streams raw UART bytes as WebSocket frames. This module
//! only moves bytes; decoding and timing are the caller's business.
//!
//! # Example
//!
//! ```rust,ignore
//! use avh_api::{ConsoleConnection, TlsMode};
//!
//! let endpoint = client.get_instance_console(instance_id).await?;
//! let mut console = ConsoleConnection::connect(&endpoint.url, &TlsMode::System).await?;
//!
//! while let Some(chunk) = console.next_chunk().await {
//!     print!("{}", String::from_utf8_lossy(&chunk?));
//! }
//!
//! console.close(Duration::from_secs(1)).await?;
//! ```

use std::time::Duration;

use futures_util::{FutureExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::Error;
use crate::transport::{TlsMode, console_connector};

/// An open console WebSocket.
pub struct ConsoleConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    url: Url,
}

impl ConsoleConnection {
    /// Open the console at `url` (`ws://` or `wss://`).
    pub async fn connect(url: &str, tls: &TlsMode) -> Result<Self, Error> {
        let url = Url::parse(url)?;
        if *tls == TlsMode::DangerAcceptInvalid {
            warn!(%url, "console TLS certificate verification is DISABLED");
        }
        let connector = console_connector(tls)?;

        info!(%url, "connecting to console");
        let (stream, _response) =
            tokio_tungstenite::connect_async_tls_with_config(url.as_str(), None, false, connector)
                .await
                .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
        debug!("console connected");

        Ok(Self { stream, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Wait for the next data frame and return its payload.
    ///
    /// Text and binary frames are both data; control frames are skipped.
    /// Returns `None` once the server closes the stream.
    pub async fn next_chunk(&mut self) -> Option<Result<Vec<u8>, Error>> {
        loop {
            let frame = self.stream.next().await?;
            match frame {
                Ok(message) => {
                    if let Some(payload) = payload_of(message) {
                        return Some(Ok(payload));
                    }
                }
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return None;
                }
                Err(e) => return Some(Err(Error::WebSocket(e.to_string()))),
            }
        }
    }

    /// Drop every frame that has already arrived, without waiting.
    ///
    /// Returns the number of data frames discarded.
    pub fn discard_buffered(&mut self) -> usize {
        let mut discarded = 0;
        while let Some(Some(frame)) = self.stream.next().now_or_never() {
            match frame {
                Ok(message) => {
                    if payload_of(message).is_some() {
                        discarded += 1;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "console error while discarding buffered output");
                    break;
                }
            }
        }
        trace!(discarded, "discarded buffered console frames");
        discarded
    }

    /// Run the close handshake, giving up after `close_timeout`.
    ///
    /// A handshake that does not finish in time is not an error: the TCP
    /// connection is dropped with `self` either way.
    pub async fn close(mut self, close_timeout: Duration) -> Result<(), Error> {
        let handshake = async {
            self.stream.close(None).await?;
            // Drain until the server acknowledges with its own close frame.
            while let Some(frame) = self.stream.next().await {
                frame?;
            }
            Ok::<(), tungstenite::Error>(())
        };

        match tokio::time::timeout(close_timeout, handshake).await {
            Ok(Ok(())
            | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed)) => {
                debug!("console closed");
                Ok(())
            }
            Ok(Err(e)) => Err(Error::WebSocket(e.to_string())),
            Err(_) => {
                debug!(
                    timeout_ms = u64::try_from(close_timeout.as_millis()).unwrap_or(u64::MAX),
                    "console close handshake timed out"
                );
                Ok(())
            }
        }
    }
}

fn payload_of(message: Message) -> Option<Vec<u8>> {
    match message {
        Message::Binary(data) => Some(data.to_vec()),
        Message::Text(text) => Some(text.as_str().as_bytes().to_vec()),
        Message::Close(frame) => {
            debug!(?frame, "console close frame received");
            None
        }
        // Ping/Pong replies are handled by tungstenite
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
    }
}
