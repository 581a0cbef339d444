// quarry-core/src/prefix.rs
// The installed-prefix namespace: (recipe name, version) -> filesystem
// path. Exactly one install operation writes a given entry; concurrent
// requests for the same entry serialize on a per-entry lock and the second
// caller reuses the completed result.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use quarry_common::error::Result;
use quarry_common::model::Version;

const INSTALL_MARKER: &str = ".quarry_installed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallDisposition {
    /// The entry was installed by this call.
    Installed,
    /// A completed install already existed and was reused.
    Reused,
}

#[derive(Debug)]
pub struct PrefixStore {
    root: PathBuf,
    entry_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PrefixStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entry_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn prefix_path(&self, name: &str, version: &Version) -> PathBuf {
        self.root.join(name).join(version.to_string())
    }

    pub fn is_installed(&self, name: &str, version: &Version) -> bool {
        self.prefix_path(name, version).join(INSTALL_MARKER).exists()
    }

    fn entry_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.entry_locks.lock().unwrap();
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `install` under the per-entry lock. A marker file written after
    /// a successful install is what makes an entry count as completed; a
    /// partially written prefix without the marker is retried on the next
    /// call.
    pub fn install_with<F>(
        &self,
        name: &str,
        version: &Version,
        install: F,
    ) -> Result<InstallDisposition>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        let key = format!("{name}@{version}");
        let lock = self.entry_lock(&key);
        let _guard = lock.lock().unwrap();

        let prefix = self.prefix_path(name, version);
        if prefix.join(INSTALL_MARKER).exists() {
            debug!("[{key}] prefix already installed, reusing {}", prefix.display());
            return Ok(InstallDisposition::Reused);
        }

        fs::create_dir_all(&prefix)?;
        install(&prefix)?;
        fs::write(prefix.join(INSTALL_MARKER), version.to_string())?;
        debug!("[{key}] installed into {}", prefix.display());
        Ok(InstallDisposition::Installed)
    }

    /// Every completed (name, version) entry under the store root.
    pub fn list_installed(&self) -> Result<Vec<(String, String)>> {
        let mut installed = Vec::new();
        if !self.root.is_dir() {
            return Ok(installed);
        }
        for name_entry in fs::read_dir(&self.root)? {
            let name_path = name_entry?.path();
            if !name_path.is_dir() {
                continue;
            }
            let Some(name) = name_path.file_name().and_then(|n| n.to_str()).map(String::from)
            else {
                continue;
            };
            for version_entry in fs::read_dir(&name_path)? {
                let version_path = version_entry?.path();
                if !version_path.join(INSTALL_MARKER).exists() {
                    continue;
                }
                if let Some(version) = version_path.file_name().and_then(|n| n.to_str()) {
                    installed.push((name.clone(), version.to_string()));
                }
            }
        }
        installed.sort();
        Ok(installed)
    }
}
