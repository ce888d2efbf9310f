use std::{
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
};

use crate::{
    config::PipelineConfig,
    error::{PipelineError, Result},
    utils,
};

/// Runs an emitted script to completion.
pub trait Dispatch {
    /// Blocks until the script exits. A non-zero exit is an error carrying the
    /// script's stderr.
    fn run(&self, script: &Path) -> Result<ExitStatus>;
}

/// Runs scripts with a shell as a child process that inherits the current
/// environment. There is no timeout and no retry.
#[derive(Debug, Clone)]
pub struct ShellDispatcher {
    shell: PathBuf,
}

impl ShellDispatcher {
    pub fn new<P: Into<PathBuf>>(shell: P) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// Uses the configured shell, or bash from $PATH.
    pub fn from_config(config: &PipelineConfig) -> eyre::Result<Self> {
        let shell = utils::find_binary("bash", config.shell_path())?;
        Ok(ShellDispatcher::new(shell))
    }
}

fn log_output(script: &Path, stream: &str, bytes: &[u8]) {
    for line in String::from_utf8_lossy(bytes).lines() {
        log::info!("[{} {stream}] {line}", script.display());
    }
}

impl Dispatch for ShellDispatcher {
    fn run(&self, script: &Path) -> Result<ExitStatus> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        log::info!("{cmd:?}");
        let output = cmd
            .output()
            .map_err(|e| PipelineError::io(&self.shell, e))?;
        log_output(script, "stdout", &output.stdout);
        log_output(script, "stderr", &output.stderr);
        log::info!("Exit code: {}", output.status);

        if output.status.success() {
            Ok(output.status)
        } else {
            Err(PipelineError::Dispatch {
                script: script.to_path_buf(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
