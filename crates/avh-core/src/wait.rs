// ── Instance state polling ──

use avh_api::InstanceState;
use tokio::time::Instant;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::backend::VirtualHardware;
use crate::config::WaitPolicy;
use crate::error::CoreError;

/// Poll until the instance reports `target`.
///
/// The first query goes out immediately. Observing `error` aborts the
/// wait unless `error` is the target. Gives up with
/// [`CoreError::StateWaitTimeout`] once `policy.max_wait` has elapsed.
pub async fn wait_for_state<H: VirtualHardware>(
    hw: &H,
    id: Uuid,
    target: InstanceState,
    policy: &WaitPolicy,
) -> Result<(), CoreError> {
    let started = Instant::now();
    let mut polls: u32 = 0;

    loop {
        let state = hw.get_instance_state(id).await?;
        polls += 1;
        trace!(%id, %state, polls, "polled instance state");

        if state == target {
            debug!(%id, %target, polls, "instance reached target state");
            return Ok(());
        }
        if state == InstanceState::Error {
            return Err(CoreError::InstanceFailed { id });
        }

        let waited = started.elapsed();
        if waited >= policy.max_wait {
            return Err(CoreError::StateWaitTimeout {
                id,
                target,
                last: state,
                waited,
            });
        }

        tokio::time::sleep(policy.interval).await;
    }
}
