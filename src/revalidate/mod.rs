//! Balera revalidation subsystem.
//!
//! Keeps cached page output consistent with record mutations:
//!
//! - The **change notifier** observes every committed create/update/delete,
//!   builds one [`ChangeEvent`] per mutation, and delivers it to the
//!   invalidation endpoint over HTTP with best effort. Delivery is decoupled
//!   from the mutation by a bounded queue; a failure here can only extend
//!   staleness until the cache TTL, never undo or delay the mutation.
//! - The **invalidation endpoint** authenticates the caller, validates the
//!   event, derives the affected page paths with a pure total function, and
//!   stale-marks each path independently.
//!
//! No ordering is guaranteed between events; stale-marking is idempotent and
//! commutative, so reordering costs at most a redundant regeneration. There
//! is no durable retry queue: the render cache's freshness window is the
//! backstop for invalidations lost to transient outages.

mod config;
mod endpoint;
mod event;
mod notifier;
mod paths;

pub use config::RevalidationConfig;
pub use endpoint::{InvalidationResult, RevalidateState, apply, revalidate_router};
pub use event::{ChangeEvent, ChangeEventError, ChangeKind, ChangePayload, Operation};
pub use notifier::{ChangeNotifier, NotifyError};
pub use paths::affected_paths;
