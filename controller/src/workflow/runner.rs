use crate::generator::authority::EchoAuthority;
use crate::generator::profile::{GeneratorConfig, SyntheticFeeds};
use crate::gui_bridge::bridge::{OperatorBridge, SharedController};
use crate::workflow::config::ControllerConfig;
use anyhow::{bail, Context};
use serde::Serialize;
use signalcore::allocation::GreenTimeAllocator;
use signalcore::authority::{HttpSignalAuthority, PresenceVerifier, SignalAuthority};
use signalcore::control::{SessionDeps, SessionView, SignalController, Ticker};
use signalcore::feeds::{feed_requests, FeedSource, HttpFeedSource};
use signalcore::telemetry::{ControlMetrics, MetricsSnapshot};
use signalcore::Direction;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout, Instant};

const SETTLE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub round: u32,
    pub demand: [u32; 4],
    pub allocation: [u32; 4],
    pub active: Direction,
    pub remaining: u32,
    pub remote_signal: Option<Direction>,
}

impl RoundSummary {
    fn from_view(round: u32, view: &SessionView) -> Self {
        Self {
            round,
            demand: Direction::ALL.map(|direction| view.demand.demand(direction)),
            allocation: view.allocation.as_array(),
            active: view.cycle.active,
            remaining: view.cycle.remaining,
            remote_signal: view.remote_signal,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OfflineReport {
    pub junction: String,
    pub rounds: Vec<RoundSummary>,
    pub metrics: MetricsSnapshot,
}

#[derive(Clone)]
pub struct Runner {
    config: ControllerConfig,
    metrics: Arc<ControlMetrics>,
}

impl Runner {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(ControlMetrics::new()),
        }
    }

    fn deps(
        &self,
        feeds: Arc<dyn FeedSource>,
        authority: Arc<dyn SignalAuthority>,
    ) -> SessionDeps {
        SessionDeps {
            feeds,
            layout: self.config.layout,
            authority,
            verifier: Arc::new(PresenceVerifier),
            allocator: GreenTimeAllocator::new(self.config.allocator),
            metrics: self.metrics.clone(),
            tick_period: self.config.tick_period(),
        }
    }

    /// Controller wired to the HTTP feed service and signal authority.
    pub fn live_controller(&self) -> anyhow::Result<SignalController> {
        let feeds = HttpFeedSource::new(self.config.feeds.clone(), self.config.connect_timeout())
            .context("building feed client")?;
        let authority =
            HttpSignalAuthority::new(self.config.override_url.clone(), self.config.notify_timeout())
                .context("building signal authority client")?;
        Ok(SignalController::new(
            self.config.catalog(),
            self.deps(Arc::new(feeds), Arc::new(authority)),
        ))
    }

    /// Runs a session against seeded synthetic demand, one demand round followed by
    /// `ticks_per_round` logical ticks at a time.
    pub async fn run_offline(
        &self,
        junction: &str,
        generator: GeneratorConfig,
    ) -> anyhow::Result<OfflineReport> {
        let feeds = Arc::new(SyntheticFeeds::new(generator.clone(), self.config.layout));
        let authority = Arc::new(EchoAuthority::new(feeds.clone()));
        let mut controller =
            SignalController::new(self.config.catalog(), self.deps(feeds.clone(), authority));

        let (ticker, driver) = Ticker::manual();
        let session = controller.select_junction_with(junction, ticker).await?;
        let expected = feed_requests(session.junction(), self.config.layout).len();
        wait_until(|| feeds.open_channels() == expected)
            .await
            .context("synthetic channels did not open")?;

        let mut watch = session.watch();
        let mut rounds = Vec::with_capacity(generator.rounds as usize);
        for round in 0..generator.rounds {
            let counts = feeds.next_counts();
            feeds.emit_demand(counts);
            timeout(
                SETTLE,
                watch.wait_for(|view| {
                    Direction::ALL
                        .iter()
                        .all(|&d| view.demand.observed(d) == Some(counts[d.index()]))
                }),
            )
            .await
            .with_context(|| format!("round {} demand was not applied", round))?
            .context("session ended during offline run")?;

            driver.advance(generator.ticks_per_round);
            let view = session.sync().await?;
            rounds.push(RoundSummary::from_view(round, &view));
        }

        let junction = session.junction().id.to_string();
        controller.close().await;
        Ok(OfflineReport {
            junction,
            rounds,
            metrics: self.metrics.snapshot(),
        })
    }

    /// Monitors `junction` live and exposes the operator bridge until Ctrl+C.
    pub async fn serve(&self, junction: &str) -> anyhow::Result<()> {
        let mut controller = self.live_controller()?;
        controller
            .select_junction(junction)
            .await
            .with_context(|| format!("selecting junction {}", junction))?;

        let shared: SharedController = Arc::new(Mutex::new(controller));
        let bridge = OperatorBridge::new(shared.clone());
        bridge
            .serve(self.config.bind, async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;

        shared.lock().await.close().await;
        Ok(())
    }
}

async fn wait_until(mut ready: impl FnMut() -> bool) -> anyhow::Result<()> {
    let deadline = Instant::now() + SETTLE;
    while !ready() {
        if Instant::now() >= deadline {
            bail!("timed out after {:?}", SETTLE);
        }
        sleep(Duration::from_millis(5)).await;
    }
    Ok(())
}
