//! Static configuration schema and the mutation validator.
//!
//! The schema is read-only metadata loaded once at startup: per object type
//! it describes the owning component, object kind, per-property type and
//! default information, the ordered callback list, and the HA sync flags.
//! The validator checks a fully merged object against this metadata before
//! the pipeline is allowed to touch the store.

mod builtin;
mod catalog;
mod descriptor;
mod validator;


pub use builtin::*;
pub use catalog::*;
pub use descriptor::*;
pub use validator::*;
