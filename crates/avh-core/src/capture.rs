// ── Console capture ──

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::backend::ConsoleStream;
use crate::error::CoreError;

/// Accumulate console output until `started + duration`.
///
/// Raw bytes are buffered and decoded as UTF-8 once the window closes,
/// so a character split across chunks survives; invalid sequences become
/// U+FFFD instead of failing the run. The stream ending early stops the
/// capture without error. A deadline already in the past returns an
/// empty string without reading.
pub async fn capture_console<C: ConsoleStream>(
    console: &mut C,
    started: Instant,
    duration: Duration,
) -> Result<String, CoreError> {
    let deadline = started + duration;
    let mut raw: Vec<u8> = Vec::new();
    let mut chunks: usize = 0;

    while Instant::now() < deadline {
        match tokio::time::timeout_at(deadline, console.next_chunk()).await {
            Err(_elapsed) => break,
            Ok(None) => {
                debug!(chunks, "console stream ended before the capture window closed");
                break;
            }
            Ok(Some(Err(e))) => {
                return Err(CoreError::Console {
                    message: e.to_string(),
                });
            }
            Ok(Some(Ok(bytes))) => {
                chunks += 1;
                trace!(len = bytes.len(), "console chunk");
                raw.extend_from_slice(&bytes);
            }
        }
    }

    debug!(chunks, bytes = raw.len(), "console capture finished");
    Ok(String::from_utf8_lossy(&raw).into_owned())
}
