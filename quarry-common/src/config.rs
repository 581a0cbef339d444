// quarry-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};

use directories::UserDirs;
use tracing::debug;

use super::error::{QuarryError, Result};
use super::model::spec::{CompilerFamily, Toolchain};

const QUARRY_ROOT_ENV: &str = "QUARRY_ROOT";
const QUARRY_RECIPES_ENV: &str = "QUARRY_RECIPES";
const QUARRY_COMPILER_ENV: &str = "QUARRY_COMPILER";
const QUARRY_PLATFORM_ENV: &str = "QUARRY_PLATFORM";
const DEFAULT_ROOT_DIR_NAME: &str = ".quarry";

#[derive(Debug, Clone)]
pub struct Config {
    pub quarry_root: PathBuf,
    pub recipes_dir: PathBuf,
    pub toolchain: Toolchain,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading quarry configuration");

        let quarry_root = match env::var(QUARRY_ROOT_ENV).ok().filter(|s| !s.is_empty()) {
            Some(root) => PathBuf::from(root),
            None => {
                let user_dirs = UserDirs::new().ok_or_else(|| {
                    QuarryError::Config(
                        "Could not determine home directory for quarry root".to_string(),
                    )
                })?;
                user_dirs.home_dir().join(DEFAULT_ROOT_DIR_NAME)
            }
        };
        debug!("Effective QUARRY_ROOT set to: {}", quarry_root.display());

        let recipes_dir = match env::var(QUARRY_RECIPES_ENV).ok().filter(|s| !s.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => quarry_root.join("recipes"),
        };

        // Toolchain identity is declared, never detected: detection belongs to
        // the host environment, not this engine.
        let compiler = env::var(QUARRY_COMPILER_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| CompilerFamily::from_name(&s))
            .unwrap_or(CompilerFamily::Gcc);
        let platform = env::var(QUARRY_PLATFORM_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| env::consts::OS.to_string());

        debug!(
            "Toolchain identity: compiler={}, platform={}",
            compiler, platform
        );

        Ok(Self {
            quarry_root,
            recipes_dir,
            toolchain: Toolchain { compiler, platform },
        })
    }

    pub fn quarry_root(&self) -> &Path {
        &self.quarry_root
    }

    pub fn recipes_dir(&self) -> &Path {
        &self.recipes_dir
    }

    pub fn store_dir(&self) -> PathBuf {
        self.quarry_root.join("store")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.quarry_root.join("logs")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.quarry_root.join("tmp")
    }
}
