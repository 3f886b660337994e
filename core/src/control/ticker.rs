use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Source of logical one-second steps for a session.
pub enum Ticker {
    Interval(Interval),
    Manual(mpsc::UnboundedReceiver<()>),
}

/// Handle that feeds a manual ticker.
pub struct TickDriver {
    ticks: mpsc::UnboundedSender<()>,
}

impl Ticker {
    /// First tick fires one `period` after creation. Missed ticks are delivered in
    /// a burst so the logical step count stays exact.
    pub fn interval(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
        Ticker::Interval(interval)
    }

    pub fn manual() -> (Self, TickDriver) {
        let (ticks, rx) = mpsc::unbounded_channel();
        (Ticker::Manual(rx), TickDriver { ticks })
    }

    /// Waits for the next step. A manual ticker whose driver is gone never fires again.
    pub async fn tick(&mut self) {
        match self {
            Ticker::Interval(interval) => {
                interval.tick().await;
            }
            Ticker::Manual(ticks) => {
                if ticks.recv().await.is_none() {
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}

impl TickDriver {
    /// Queues `steps` ticks; `false` once the session has ended.
    pub fn advance(&self, steps: u32) -> bool {
        (0..steps).all(|_| self.ticks.send(()).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_ticker_fires_once_per_step() {
        let (mut ticker, driver) = Ticker::manual();
        assert!(driver.advance(2));
        ticker.tick().await;
        ticker.tick().await;
        let pending = tokio::time::timeout(Duration::from_millis(20), ticker.tick()).await;
        assert!(pending.is_err());

        drop(driver);
        let after_drop = tokio::time::timeout(Duration::from_millis(20), ticker.tick()).await;
        assert!(after_drop.is_err());
    }
}
