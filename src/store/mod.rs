//! In-memory configuration tree.
//!
//! One process-wide store holds every configuration object. A single
//! read/write lock guards the tree; the whole validate -> callback ->
//! commit sequence of a mutation runs under one write transaction so no
//! reader ever observes a half-applied change. A derived flat key=value
//! view for legacy lookup paths is cached behind its own mutex, never
//! held together with the tree lock.

mod config_store;
mod flat_view;


pub use config_store::*;
pub use flat_view::*;
