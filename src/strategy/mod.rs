/*!
 * Strategy Catalog
 *
 * Self-contained removal techniques, each idempotent and individually
 * fallible, tried in order of increasing invasiveness.
 */

pub mod catalog;
pub mod context;
pub mod deferred;
pub mod direct;
pub mod escalate;
pub mod mirror;
pub mod neutralize;
pub mod rename;
pub mod shell;
pub mod terminate;
pub mod traits;

pub use catalog::StrategyCatalog;
pub use context::{Capabilities, Effects, StrategyContext};
pub use deferred::DeferredDeletion;
pub use direct::DirectRemoval;
pub use escalate::EscalateOwnership;
pub use mirror::{DirectoryMirror, MirrorToEmpty, SyncMirror};
pub use neutralize::NeutralizeContents;
pub use rename::RenameThenDelete;
pub use shell::{AlternateRemoval, AlternateRemover, ShellRemover};
pub use terminate::TerminateHolders;
pub use traits::Strategy;
