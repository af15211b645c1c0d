//! OxiRotate Logs - Copy-truncate rotation, retention, and the watched-file registry

mod archive;
pub mod error;
mod guard;
pub mod naming;
mod registry;
pub mod retention;
mod rotation;
pub mod stats;

pub use error::{Result, RotationError, RotationErrorKind};
pub use guard::{InFlight, InFlightGuard};
pub use naming::{base_of, base_prefix, ArchiveNamer};
pub use registry::WatchedRegistry;
pub use retention::{prune, PruneReport};
pub use rotation::{RotationEngine, RotationOutcome};
pub use stats::{dir_contents, LogDirGauges};
