pub mod bootstrap;
pub mod config;
pub mod error;
pub mod helper;
pub mod logging;
pub mod node;

pub use config::Config;
pub use error::{Error, Result};
pub use helper::NodeHelper;
pub use node::{has_changed, NodeInfo, Snapshot};
