#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod editor;
pub mod error;
pub mod history;
pub mod intent;
pub mod ir;
pub mod naming;
pub mod occupancy;
pub mod snap;
pub mod store;
pub mod traffic;
pub mod view;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use editor::{ConnectOutcome, IgnoredConnect, TopologyEditor, resync};
pub use error::TopologyError;
pub use intent::{Intent, Outcome, parse_intent, parse_script};
pub use ir::{Direction, PortId, Position, TerminalCategory, Topology};
pub use snap::{PortLayout, SnapDecision};
pub use store::{CableConfig, EntityPatch, Handle, PortPatch, TerminalConfig};
pub use view::TopologyView;
