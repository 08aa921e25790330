//! CLI command implementations.

pub(crate) mod object;
pub(crate) mod store;
pub(crate) mod watch;

pub(crate) use object::{ApplyArgs, DeleteArgs, GetArgs, ListArgs, PatchArgs};
pub(crate) use watch::WatchArgs;
