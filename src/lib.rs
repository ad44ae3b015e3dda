//! # rexos
//!
//! Async driver for managing Extreme Networks EXOS switches over SSH.
//!
//! The crate speaks the native EXOS CLI through an interactive shell
//! channel and exposes a small, typed surface on top of it: device facts,
//! an interface inventory, raw CLI pass-through, and a
//! candidate-configuration lifecycle with merge and replace modes,
//! diffing, and automatic rollback when a commit is rejected mid-flight.
//!
//! ## Quick start
//!
//! ```no_run
//! use rexos::driver::{ExosDriver, NetworkDriver};
//! use rexos::session::ConfigSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut driver = ExosDriver::new("10.0.0.1", "admin", "secret");
//!     driver.open().await?;
//!
//!     let facts = driver.get_facts().await?;
//!     println!("{} running {}", facts.hostname, facts.os_version);
//!
//!     driver
//!         .load_merge_candidate(ConfigSource::Text(
//!             "create vlan blue\nconfigure vlan blue tag 42".to_string(),
//!         ))
//!         .await?;
//!     println!("{}", driver.compare_config().await?);
//!     driver.commit_config().await?;
//!
//!     driver.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Offline use
//!
//! [`session::ScriptedSession`] implements the same session contract from
//! canned command outputs, so driver behavior can be exercised without a
//! device. Its call log records every device interaction for assertions.

pub mod config;
pub mod driver;
pub mod error;
pub mod facts;
pub mod interfaces;
pub mod session;
pub mod templates;

pub use driver::{ConfigMode, ConfigState, DriverOptions, ExosDriver, NetworkDriver};
pub use error::DriverError;
pub use facts::Facts;
pub use interfaces::Interface;
pub use session::{CliSession, ConfigSource};
