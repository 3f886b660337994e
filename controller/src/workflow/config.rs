use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use signalcore::allocation::AllocatorConfig;
use signalcore::control::JunctionCatalog;
use signalcore::feeds::{FeedEndpoints, FeedLayout};
use signalcore::Junction;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub junctions: Vec<Junction>,
    pub initial_junction: Option<String>,
    pub feeds: FeedEndpoints,
    pub layout: FeedLayout,
    pub override_url: String,
    pub tick_millis: u64,
    pub connect_timeout_ms: u64,
    pub notify_timeout_ms: u64,
    pub allocator: AllocatorConfig,
    pub bind: SocketAddr,
}

fn default_catalog() -> Vec<Junction> {
    [
        ("Junction 01", "01_", "normal_01"),
        ("Junction 02", "02_", "normal_02"),
        ("Junction 05", "05_", "flipped_03"),
        ("Rifatslu", "rifatuslu_", "flipped_04"),
    ]
    .into_iter()
    .map(|(label, id, feed)| Junction {
        feed_alias: Some(feed.to_string()),
        ..Junction::new(label, id)
    })
    .collect()
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            junctions: default_catalog(),
            initial_junction: None,
            feeds: FeedEndpoints::default(),
            layout: FeedLayout::PerDirection,
            override_url: "http://localhost:8000/junction_signal_status".to_string(),
            tick_millis: 1000,
            connect_timeout_ms: 3000,
            notify_timeout_ms: 5000,
            allocator: AllocatorConfig::default(),
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
        }
    }
}

impl ControllerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading controller config {}", path_ref.display()))?;
        let config: ControllerConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing controller config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Command-line values win over the file and the defaults.
    pub fn with_overrides(mut self, tick_millis: Option<u64>, bind: Option<SocketAddr>) -> Self {
        if let Some(tick_millis) = tick_millis {
            self.tick_millis = tick_millis;
        }
        if let Some(bind) = bind {
            self.bind = bind;
        }
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.junctions.is_empty() {
            bail!("junction catalog is empty");
        }
        if self.tick_millis == 0 {
            bail!("tick_millis must be positive");
        }
        self.allocator
            .validate()
            .context("invalid allocator parameters")?;
        if let Some(initial) = &self.initial_junction {
            self.catalog()
                .resolve(initial)
                .with_context(|| "initial_junction is not in the catalog".to_string())?;
        }
        Ok(())
    }

    pub fn catalog(&self) -> JunctionCatalog {
        JunctionCatalog::new(self.junctions.clone())
    }

    /// Explicit choice, then the configured initial junction, then the first entry.
    pub fn starting_junction(&self, requested: Option<&str>) -> Option<String> {
        requested
            .map(str::to_string)
            .or_else(|| self.initial_junction.clone())
            .or_else(|| self.junctions.first().map(|j| j.id.as_str().to_string()))
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }
}
