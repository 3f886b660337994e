use super::cycle::CycleState;
use super::selection::{JunctionCatalog, JunctionSelection};
use super::session::{MonitoringSession, SessionDeps, SessionView};
use super::ticker::Ticker;
use crate::prelude::{ControlError, ControlResult, Credential, Direction, Junction};
use log::info;

/// Owns the selection context and at most one live monitoring session.
pub struct SignalController {
    selection: JunctionSelection,
    deps: SessionDeps,
    session: Option<MonitoringSession>,
}

impl SignalController {
    pub fn new(catalog: JunctionCatalog, deps: SessionDeps) -> Self {
        Self {
            selection: JunctionSelection::new(catalog),
            deps,
            session: None,
        }
    }

    pub fn selection(&self) -> &JunctionSelection {
        &self.selection
    }

    pub fn deps(&self) -> &SessionDeps {
        &self.deps
    }

    pub fn session(&self) -> Option<&MonitoringSession> {
        self.session.as_ref()
    }

    pub fn view(&self) -> Option<SessionView> {
        self.session().map(MonitoringSession::view)
    }

    /// Switches monitoring to `id` with a wall-clock ticker.
    pub async fn select_junction(&mut self, id: &str) -> ControlResult<&MonitoringSession> {
        let ticker = Ticker::interval(self.deps.tick_period);
        self.select_junction_with(id, ticker).await
    }

    /// Unknown ids fail before anything is torn down or opened. Otherwise the
    /// previous session is fully closed before the new one subscribes.
    pub async fn select_junction_with(
        &mut self,
        id: &str,
        ticker: Ticker,
    ) -> ControlResult<&MonitoringSession> {
        let junction: Junction = self.selection.catalog().resolve(id)?.clone();
        self.end_session().await;
        self.selection.select(id)?;

        info!("monitoring {} ({})", junction.label, junction.id);
        let session = MonitoringSession::start(junction, self.deps.clone(), ticker);
        Ok(self.session.insert(session))
    }

    pub async fn override_signal(
        &self,
        direction: Direction,
        credential: Option<&Credential>,
    ) -> ControlResult<CycleState> {
        self.session
            .as_ref()
            .ok_or(ControlError::SessionClosed)?
            .override_signal(direction, credential)
            .await
    }

    pub async fn end_session(&mut self) {
        if let Some(session) = self.session.take() {
            info!("closing session for {}", session.junction().id);
            session.shutdown().await;
        }
    }

    /// Ends the session and clears the selection.
    pub async fn close(&mut self) {
        self.end_session().await;
        self.selection.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::GreenTimeAllocator;
    use crate::authority::PresenceVerifier;
    use crate::feeds::{FeedKind, FeedLayout};
    use crate::telemetry::ControlMetrics;
    use crate::testing::{within, RecordingAuthority, ScriptedFeeds};
    use std::sync::Arc;
    use std::time::Duration;

    fn controller(feeds: Arc<ScriptedFeeds>, authority: Arc<RecordingAuthority>) -> SignalController {
        let catalog = JunctionCatalog::new(vec![
            Junction::new("Junction 01", "01_"),
            Junction::new("Junction 02", "02_"),
        ]);
        SignalController::new(
            catalog,
            SessionDeps {
                feeds,
                layout: FeedLayout::PerDirection,
                authority,
                verifier: Arc::new(PresenceVerifier),
                allocator: GreenTimeAllocator::default(),
                metrics: Arc::new(ControlMetrics::new()),
                tick_period: Duration::from_secs(3600),
            },
        )
    }

    #[tokio::test]
    async fn unknown_junction_opens_nothing() {
        let feeds = Arc::new(ScriptedFeeds::new());
        let (authority, _sent) = RecordingAuthority::new();
        let mut controller = controller(feeds.clone(), authority);

        let err = controller.select_junction("07_").await.err().unwrap();
        assert_eq!(err, ControlError::UnknownJunction("07_".into()));
        assert!(controller.session().is_none());
        assert!(controller.selection().current().is_none());
        tokio::task::yield_now().await;
        assert_eq!(feeds.open_total(), 0);
    }

    #[tokio::test]
    async fn switching_junction_never_leaks_old_updates() {
        let feeds = Arc::new(ScriptedFeeds::new());
        let (authority, _sent) = RecordingAuthority::new();
        let mut controller = controller(feeds.clone(), authority);

        controller.select_junction("01_").await.unwrap();
        feeds.wait_open(5).await;
        let north = FeedKind::Demand(Direction::North);
        assert!(feeds.push("01_", north, r#"{"vehicles":40}"#));
        let mut watch = controller.session().unwrap().watch();
        within(watch.wait_for(|view| view.demand.demand(Direction::North) == 40))
            .await
            .unwrap();

        let mut selection = controller.selection().subscribe();
        controller.select_junction("02_").await.unwrap();
        assert_eq!(feeds.open_for("01_"), 0);
        assert!(!feeds.push("01_", north, r#"{"vehicles":99}"#));
        assert!(selection.has_changed().unwrap());
        assert_eq!(
            selection.borrow_and_update().as_ref().map(|j| j.id.as_str().to_string()),
            Some("02_".to_string())
        );

        feeds.wait_open(5).await;
        assert!(feeds.push("02_", north, r#"{"vehicles":3}"#));
        let mut watch = controller.session().unwrap().watch();
        let view = within(watch.wait_for(|view| view.demand.total() > 0))
            .await
            .unwrap()
            .clone();
        assert_eq!(view.junction.id.as_str(), "02_");
        assert_eq!(view.demand.demand(Direction::North), 3);
    }

    #[tokio::test]
    async fn override_requires_a_session() {
        let feeds = Arc::new(ScriptedFeeds::new());
        let (authority, mut sent) = RecordingAuthority::new();
        let mut controller = controller(feeds, authority);
        let credential = Credential::bearer("operator");

        assert_eq!(
            controller
                .override_signal(Direction::South, Some(&credential))
                .await,
            Err(ControlError::SessionClosed)
        );

        controller.select_junction("02_").await.unwrap();
        let state = controller
            .override_signal(Direction::South, Some(&credential))
            .await
            .unwrap();
        assert_eq!(state.active, Direction::South);
        assert_eq!(within(sent.recv()).await.unwrap().junction.as_str(), "02_");

        controller.close().await;
        assert!(controller.view().is_none());
        assert!(controller.selection().current().is_none());
    }
}
