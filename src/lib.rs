//! # proclet
//!
//! Process lifecycle toolkit for integration-test and orchestration
//! harnesses: start a command, capture its output, detect termination,
//! forcibly stop it.
//!
//! Two layers:
//! - [`ProcessHandle`] — one spawned process: status state machine, output
//!   buffers, timing, exit information, condition polling.
//! - [`ProcessGroup`] — an aggregate over handles with two mutually
//!   exclusive modes: sequential retry of one command template
//!   ([`ProcessGroup::repeat`]) or a fixed parallel set
//!   ([`ProcessGroup::start_all`] / [`ProcessGroup::wait_all_conditions`]).
//!
//! ```no_run
//! use proclet::{ProcessGroup, ServiceConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> proclet::Result<()> {
//! let mut group = ProcessGroup::new(ServiceConfig::new("./flaky-server"));
//!
//! let ready = group
//!     .repeat(
//!         || std::path::Path::new("/tmp/server.ready").exists(),
//!         Duration::from_millis(10_000),
//!         Duration::from_millis(500),
//!     )
//!     .await?;
//! assert!(ready);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod group;
pub mod process;

pub use config::ServiceConfig;
pub use error::{ProcletError, Result};
pub use group::{GroupMode, ProcessGroup};
pub use process::{ProcessHandle, ProcessStatus};
