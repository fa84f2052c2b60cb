use std::fmt;

use crate::value::PropertyBag;

/// Kind of change a subscriber is being told about.
///
/// `NameRestore` only appears on the rollback path: the property bag it
/// carries is the pre-change snapshot the subscriber must re-apply.
/// Subscribers must be idempotent under rollback replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeMode {
    /// Create or update with the full merged property bag
    Props,
    /// Instance removal; the bag carries identifying keys only
    Delete,
    /// Rollback marker carrying the pre-change snapshot
    NameRestore,
}

impl fmt::Display for ChangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeMode::Props => "props",
            ChangeMode::Delete => "delete",
            ChangeMode::NameRestore => "name-restore",
        };
        f.write_str(s)
    }
}

/// Contract between the configuration pipeline and a server subsystem.
///
/// Implementations run synchronously on the mutating thread while the
/// store write lock is held, so they must not block indefinitely.
#[cfg_attr(test, mockall::automock)]
pub trait ConfigSubscriber: Send + Sync {
    fn on_change<'a>(
        &self,
        object_type: &str,
        name: Option<&'a str>,
        props: &PropertyBag,
        mode: ChangeMode,
    ) -> std::result::Result<(), String>;
}

/// Stand-in subscriber for components that are allowed to run without an
/// explicit registration (Store, Engine). Accepts everything.
#[derive(Debug, Default)]
pub struct NullSubscriber;

impl ConfigSubscriber for NullSubscriber {
    fn on_change(
        &self,
        _object_type: &str,
        _name: Option<&str>,
        _props: &PropertyBag,
        _mode: ChangeMode,
    ) -> std::result::Result<(), String> {
        Ok(())
    }
}
