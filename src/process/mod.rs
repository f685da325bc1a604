// Process module - single-process lifecycle primitives

pub mod handle;
pub mod signal;
pub mod spawner;
pub mod types;

pub use handle::ProcessHandle;
pub use spawner::{spawn_process, SpawnedProcess};
pub use types::ProcessStatus;
