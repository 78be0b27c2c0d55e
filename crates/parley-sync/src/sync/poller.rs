use std::sync::Arc;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use parley_types::models::ConversationId;

use crate::collaborator::Collaborator;
use crate::sync::Inner;

/// Re-fetches the roster every `roster_interval`, starting immediately.
/// Failures are logged and the previous roster stays visible.
pub(crate) async fn run_roster_poller<C: Collaborator>(
    inner: Arc<Inner<C>>,
    token: CancellationToken,
) {
    let mut interval = tokio::time::interval(inner.config.roster_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = inner.refresh_roster() => {
                if let Err(e) = result {
                    warn!("Roster poll failed: {}", e);
                }
            }
        }
    }

    debug!("Roster poller stopped");
}

/// Re-fetches one conversation every `message_interval`. The immediate fetch
/// on selection is done by the caller, so the first tick is one period out.
pub(crate) async fn run_conversation_poller<C: Collaborator>(
    inner: Arc<Inner<C>>,
    conversation_id: ConversationId,
    token: CancellationToken,
) {
    let period = inner.config.message_interval;
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = inner.fetch_messages(&conversation_id) => {
                if let Err(e) = result {
                    warn!("Message poll for {} failed: {}", conversation_id, e);
                }
            }
        }
    }

    debug!("Message poller for {} stopped", conversation_id);
}
