use std::env;

use nanoid::nanoid;
use tracing::debug;
use tracing::warn;

use crate::errors::LifecycleError;
use crate::errors::Result;
use crate::schema::SchemaCatalog;
use crate::store::StoreReader;

/// Environment override for the 7-character serial prefix; primarily for
/// test environments without platform data.
pub const UID_SERIAL_ENV: &str = "DYNCFG_SERIAL";

const SERIAL_LEN: usize = 7;
const RANDOM_LEN: usize = 24;
const GENERATE_RETRIES: usize = 5;

/// Base62 alphabet for the random part of a generated object UID.
const BASE62: [char; 62] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H',
    'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Generates the 32-character object UIDs:
/// `<7-char serial>-<24-char base62 random>`.
#[derive(Debug, Clone)]
pub struct UidGenerator {
    serial: String,
}

impl UidGenerator {
    /// `serial` comes from the platform settings; the environment
    /// variable wins when set to a well-formed 7-character value.
    pub fn new(serial: Option<&str>) -> Self {
        let from_env = env::var(UID_SERIAL_ENV).ok();
        let serial = match from_env.as_deref().or(serial) {
            Some(s) if s.len() == SERIAL_LEN => s.to_string(),
            Some(s) => {
                warn!("serial number {s:?} is not a {SERIAL_LEN}-character string, using fallback");
                "X".repeat(SERIAL_LEN)
            }
            None => "X".repeat(SERIAL_LEN),
        };
        Self { serial }
    }

    /// One candidate UID, uniqueness not yet checked.
    pub fn generate(&self) -> String {
        format!("{}-{}", self.serial, nanoid!(RANDOM_LEN, &BASE62))
    }

    /// Generate a UID unique across every UID-carrying type in the
    /// store. Retries a bounded number of times on collision.
    ///
    /// Must be called with the store write lock held (pass the open
    /// transaction as `reader`) so no concurrent mutation can introduce
    /// the same UID between check and commit.
    pub fn assign(&self, reader: &dyn StoreReader, catalog: &SchemaCatalog) -> Result<String> {
        for attempt in 0..GENERATE_RETRIES {
            let candidate = self.generate();
            let types: Vec<&str> = catalog.uid_types().map(|schema| schema.object_type).collect();
            if !reader.uid_exists(&types, &candidate) {
                return Ok(candidate);
            }
            debug!("generated UID collided (attempt {})", attempt + 1);
        }
        Err(LifecycleError::UuidConfigError.into())
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }
}
