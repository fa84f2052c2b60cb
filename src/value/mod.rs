//! Core value model for the configuration tree.
//!
//! Everything the control plane stores, validates, or replicates is built
//! from these types:
//! - `ConfigValue` is the tagged union for a single scalar/array/object value
//! - `PropertyBag` is the ordered key -> value mapping of one object instance
//! - `PropertyKey` is the structured form of the legacy `Type.Field.Name` key

mod config_value;
mod property_key;

#[cfg(test)]
mod value_test;

pub use config_value::*;
pub use property_key::*;
