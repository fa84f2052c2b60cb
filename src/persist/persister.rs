use std::fs;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::errors::PersistError;
use crate::metrics::PERSIST_FAILURES;
use crate::persist::document_to_tree;
use crate::persist::legacy_to_tree;
use crate::persist::tree_to_document;
use crate::persist::tree_to_legacy;
use crate::schema::SchemaCatalog;
use crate::store::ConfigTree;

/// Transient write failures are retried this many times before the
/// update is abandoned.
const UPDATE_RETRIES: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_millis(20);

/// Writes the configuration file with an atomic replacement protocol.
///
/// Every update serializes the full tree to `<file>.tmp`, renames the
/// current file to `<file>.bak` and renames `.tmp` into place, so a
/// crash at any point leaves either the old or the new file complete on
/// disk. The first update ever also copies the pristine file to
/// `<file>.org` before touching it. A dedicated mutex serializes file
/// replacement independently of the in-memory tree lock.
pub struct PersistenceManager {
    config_dir: PathBuf,
    file_name: String,
    server_name: String,
    server_version: String,
    file_lock: Mutex<()>,
}

impl PersistenceManager {
    pub fn new(
        config_dir: impl Into<PathBuf>,
        file_name: &str,
        server_name: &str,
        server_version: &str,
    ) -> Self {
        Self {
            config_dir: config_dir.into(),
            file_name: file_name.to_string(),
            server_name: server_name.to_string(),
            server_version: server_version.to_string(),
            file_lock: Mutex::new(()),
        }
    }

    /// Path of the live configuration file.
    pub fn current_path(&self) -> PathBuf {
        self.config_dir.join(&self.file_name)
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        self.config_dir.join(format!("{}.{}", self.file_name, suffix))
    }

    /// Persist the tree as the JSON configuration document.
    pub fn save(&self, tree: &ConfigTree) -> Result<(), PersistError> {
        let doc = tree_to_document(tree, &self.server_name, &self.server_version);
        let content = serde_json::to_string_pretty(&doc)?;
        self.update_file(content.as_bytes())
    }

    /// Persist the tree in the legacy flat key=value format. Kept for
    /// installations that still feed the file to external tooling.
    pub fn save_legacy(&self, tree: &ConfigTree) -> Result<(), PersistError> {
        let content = tree_to_legacy(tree);
        self.update_file(content.as_bytes())
    }

    /// Load the configuration file if one exists. JSON documents are
    /// detected by the leading `{`; anything else is parsed as the
    /// legacy flat format.
    pub fn load(&self, catalog: &SchemaCatalog) -> Result<Option<ConfigTree>, PersistError> {
        let path = self.current_path();
        let _guard = self.file_lock.lock();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("no configuration file at {:?}, starting empty", path);
                return Ok(None);
            }
            Err(e) => return Err(PersistError::PathError { path, source: e }),
        };
        let tree = if content.trim_start().starts_with('{') {
            let doc: serde_json::Value = serde_json::from_str(&content)?;
            document_to_tree(&doc)?
        } else {
            debug!("configuration file {:?} is in the legacy format", path);
            legacy_to_tree(&content, catalog)?
        };
        Ok(Some(tree))
    }

    /// Replace the configuration file with `content`.
    fn update_file(&self, content: &[u8]) -> Result<(), PersistError> {
        let _guard = self.file_lock.lock();

        let current = self.current_path();
        let org = self.sibling("org");
        let tmp = self.sibling("tmp");
        let bak = self.sibling("bak");

        // Keep a one-time snapshot of the original file.
        if current.exists() && !org.exists() {
            if let Err(e) = fs::copy(&current, &org) {
                warn!("could not snapshot {:?} to {:?}: {}", current, org, e);
            }
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.replace_once(&current, &tmp, &bak, content) {
                Ok(()) => {
                    debug!("configuration file {:?} updated", current);
                    return Ok(());
                }
                Err(e) if is_transient(&e) && attempt < UPDATE_RETRIES => {
                    warn!(
                        "transient failure updating {:?} (attempt {}): {}",
                        current, attempt, e
                    );
                    thread::sleep(RETRY_DELAY);
                }
                Err(e) if is_transient(&e) => {
                    error!("giving up on {:?} after {} attempts: {}", current, attempt, e);
                    PERSIST_FAILURES
                        .with_label_values(&[&self.file_name])
                        .inc();
                    return Err(PersistError::RetriesExhausted { attempts: attempt });
                }
                Err(e) => {
                    error!("configuration file update failed for {:?}: {}", current, e);
                    PERSIST_FAILURES
                        .with_label_values(&[&self.file_name])
                        .inc();
                    return Err(PersistError::PathError {
                        path: current,
                        source: e,
                    });
                }
            }
        }
    }

    fn replace_once(
        &self,
        current: &Path,
        tmp: &Path,
        bak: &Path,
        content: &[u8],
    ) -> io::Result<()> {
        let mut file = fs::File::create(tmp)?;
        file.write_all(content)?;
        file.sync_all()?;
        drop(file);

        // No current file on first boot; nothing to keep as .bak.
        if current.exists() {
            if bak.exists() {
                fs::remove_file(bak)?;
            }
            fs::rename(current, bak)?;
        }
        fs::rename(tmp, current)?;
        Ok(())
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
