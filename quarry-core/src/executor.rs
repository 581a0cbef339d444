// quarry-core/src/executor.rs
// The external-collaborator boundary for action execution. The engine
// sequences actions and propagates the first failure; what an action *does*
// is decided entirely here (or by an embedder's implementation, which is
// also where a timeout policy belongs).

use std::collections::HashMap;
use std::fs;
use std::process::Command;

use tracing::debug;

use quarry_common::error::{QuarryError, Result};

use crate::install::InstallAction;

pub trait ActionExecutor: Send + Sync {
    /// Open a session for one node's action sequence. Environment set by
    /// earlier actions applies to later ones within the same session only.
    fn session(&self, node: &str) -> Box<dyn ActionSession>;
}

pub trait ActionSession: Send {
    fn apply(&mut self, action: &InstallAction) -> Result<()>;
}

/// Executes actions against the real system. Env vars accumulate in the
/// session and are handed to every spawned process; the spawned program
/// blocks the calling worker for its duration.
pub struct ProcessExecutor;

impl ActionExecutor for ProcessExecutor {
    fn session(&self, node: &str) -> Box<dyn ActionSession> {
        Box::new(ProcessSession {
            node: node.to_string(),
            env: HashMap::new(),
        })
    }
}

struct ProcessSession {
    node: String,
    env: HashMap<String, String>,
}

impl ActionSession for ProcessSession {
    fn apply(&mut self, action: &InstallAction) -> Result<()> {
        match action {
            InstallAction::SetEnv { key, value } => {
                debug!("[{}] setenv {key}={value}", self.node);
                self.env.insert(key.clone(), value.clone());
                Ok(())
            }
            InstallAction::Run { program, args, cwd } => {
                debug!("[{}] running {program} {:?}", self.node, args);
                let mut command = Command::new(program);
                command.args(args).envs(&self.env);
                if let Some(cwd) = cwd {
                    command.current_dir(cwd);
                }
                let status = command.status()?;
                if status.success() {
                    Ok(())
                } else {
                    Err(QuarryError::InstallActionFailed {
                        node: self.node.clone(),
                        action: action.to_string(),
                        cause: format!("exit status: {status}"),
                    })
                }
            }
            InstallAction::CopyFile { source, dest } => {
                debug!(
                    "[{}] copying {} -> {}",
                    self.node,
                    source.display(),
                    dest.display()
                );
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(source, dest)?;
                Ok(())
            }
        }
    }
}
