//! Component registration and change notification.
//!
//! Server subsystems subscribe here to be told about accepted configuration
//! changes. The registry maps a `(ComponentType, optional object filter)`
//! pair to exactly one subscriber with a registration refcount; the mutation
//! pipeline looks subscribers up by the object type's owning component.

mod component;
mod registry;
mod subscriber;


pub use component::*;
pub use registry::*;
pub use subscriber::*;
