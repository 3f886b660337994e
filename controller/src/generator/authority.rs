use super::profile::SyntheticFeeds;
use async_trait::async_trait;
use log::info;
use signalcore::authority::SignalAuthority;
use signalcore::prelude::Credential;
use signalcore::{ControlResult, Direction, Junction};
use std::sync::Arc;

/// Offline stand-in for the signal authority: logs each change and mirrors it back
/// on the synthetic signal-status channel.
pub struct EchoAuthority {
    feeds: Arc<SyntheticFeeds>,
}

impl EchoAuthority {
    pub fn new(feeds: Arc<SyntheticFeeds>) -> Self {
        Self { feeds }
    }
}

#[async_trait]
impl SignalAuthority for EchoAuthority {
    async fn notify(
        &self,
        junction: &Junction,
        direction: Direction,
        credential: Option<&Credential>,
    ) -> ControlResult<()> {
        info!(
            "[authority] {} -> {}{}",
            junction.authority_key(),
            direction,
            if credential.is_some() { " (override)" } else { "" }
        );
        self.feeds.emit_signal(junction.feed_key(), direction);
        Ok(())
    }
}
