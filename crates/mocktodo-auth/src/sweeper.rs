//! Background reclamation of expired sessions and authorization codes.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::oidc::provider::OidcProvider;
use crate::session::SessionRegistry;

/// Starts a task that sweeps `sessions` (and the provider's authorization
/// codes, if any) every `interval` until `cancel` fires.
///
/// `interval` must be non-zero.
pub fn spawn_sweeper(
    sessions: Arc<SessionRegistry>,
    oidc: Option<Arc<OidcProvider>>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let sessions_removed = sessions.sweep_expired();
            let codes_removed = oidc.as_ref().map_or(0, |p| p.sweep_expired_codes());
            if sessions_removed > 0 || codes_removed > 0 {
                tracing::debug!(
                    sessions = sessions_removed,
                    codes = codes_removed,
                    "Swept expired credentials"
                );
            }
        }

        tracing::debug!("Sweeper stopped");
    })
}
