pub mod controller;
pub mod cycle;
pub mod selection;
pub mod session;
pub mod ticker;

pub use controller::SignalController;
pub use cycle::{CycleEvent, CycleState, SignalCycle};
pub use selection::{JunctionCatalog, JunctionSelection};
pub use session::{MonitoringSession, SessionDeps, SessionView};
pub use ticker::{TickDriver, Ticker};
