/*!
 * Target Model
 *
 * The resource under reclamation and the host primitives that inspect and
 * remove it. State is re-evaluated on every call: the processes being
 * fought can change the target mid-session.
 */

pub mod host;
pub mod path;
pub mod traits;
pub mod types;

pub use host::HostFileOps;
pub use path::{host_path, is_protected, normalize};
pub use traits::FileOps;
pub use types::{Footprint, NeutralizeReport, Target, TargetKind};
