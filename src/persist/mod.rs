//! Crash-safe persistence of the configuration tree.
//!
//! Two on-disk representations are supported: the current single JSON
//! document and the legacy flat key=value file. Both are replaced with
//! the same atomic protocol: one-time pristine snapshot (`.org`), dump
//! to `.tmp`, rename current to `.bak`, rename `.tmp` into place. The
//! previous file stays valid until the new content is fully written.

mod json_doc;
mod legacy;
mod persister;

#[cfg(test)]
mod legacy_test;

pub use json_doc::*;
pub use legacy::*;
pub use persister::*;
