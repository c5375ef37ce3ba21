//! The ffmpeg launcher.

use super::process::EncodeProcess;
use super::request::{EncodeProfile, EncodeRequest};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Starts encoder processes, at most `max_concurrent` at a time.
#[derive(Debug, Clone)]
pub struct Encoder {
    program: PathBuf,
    profile: EncodeProfile,
    stall_timeout: Duration,
    max_concurrent: usize,
    limiter: Arc<Semaphore>,
}

impl Encoder {
    /// Create an encoder that runs `program`.
    pub fn new(
        program: impl Into<PathBuf>,
        profile: EncodeProfile,
        max_concurrent: usize,
        stall_timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            profile,
            stall_timeout,
            max_concurrent,
            limiter: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// The executable this encoder runs.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The codec settings applied to every request.
    pub fn profile(&self) -> &EncodeProfile {
        &self.profile
    }

    /// Number of encodes that could start right now.
    pub fn available_slots(&self) -> usize {
        self.limiter.available_permits()
    }

    /// Spawn an encoder for `request`.
    ///
    /// Waits up to the stall timeout for a free slot.
    ///
    /// # Errors
    ///
    /// - [`Error::Busy`] if every slot stayed taken.
    /// - [`Error::Tool`] if the process cannot be spawned.
    pub async fn start(
        &self,
        request: &EncodeRequest,
        label: impl Into<String>,
    ) -> Result<EncodeProcess> {
        let label = label.into();

        let permit = match timeout(self.stall_timeout, self.limiter.clone().acquire_owned()).await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(Error::internal("encoder limiter closed")),
            Err(_) => {
                warn!(job = %label, max = self.max_concurrent, "no encoder slot available");
                return Err(Error::Busy(format!(
                    "all {} encoder slots are in use",
                    self.max_concurrent
                )));
            }
        };

        let args = request.build_args(&self.profile);
        debug!(job = %label, program = %self.program.display(), ?args, "starting encoder");

        let mut command = Command::new(&self.program);
        command.args(&args);

        EncodeProcess::spawn(command, label, self.stall_timeout, Some(permit))
    }
}
