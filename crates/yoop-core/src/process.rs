//! External process invocation.
//!
//! Every interaction with `yt-dlp`, `ffmpeg` and `ffprobe` goes through the
//! [`ToolRunner`] trait, so the catalog and audio layers can be exercised
//! without the real tools. [`Toolchain`] pairs a runner with the
//! [`ToolConfig`] and offers one entry point per tool.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::ToolConfig;
use crate::error::{Result, ToolError};
use crate::source::Classifier;

/// Captured result of one external process run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Whether the process exited with a zero status.
    pub success: bool,
    /// Human-readable exit status.
    pub status: String,
    /// Everything written to standard output.
    pub stdout: Vec<u8>,
    /// Everything written to standard error.
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    /// A successful run with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            success: true,
            status: "exit status: 0".to_string(),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// A failed run with the given stderr.
    #[must_use]
    pub fn failed(stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            success: false,
            status: "exit status: 1".to_string(),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    /// Replace stderr, keeping the rest.
    #[must_use]
    pub fn with_stderr(mut self, stderr: impl Into<Vec<u8>>) -> Self {
        self.stderr = stderr.into();
        self
    }

    /// Standard output decoded lossily as UTF-8.
    #[must_use]
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Standard error decoded lossily as UTF-8.
    #[must_use]
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Convert a non-zero exit into [`ToolError::Failed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the process did not succeed.
    pub fn into_success(self, program: &str) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(ToolError::Failed {
                program: program.to_string(),
                status: self.status.clone(),
                stderr: self.stderr_text().trim().to_string(),
            }
            .into())
        }
    }
}

/// Spawns external processes.
#[cfg_attr(test, mockall::automock)]
pub trait ToolRunner: Send + Sync {
    /// Run `program` with `args`, feeding `input` to its standard input.
    /// An empty `input` leaves standard input closed.
    ///
    /// Only a failure to start the process is an error; the exit status is
    /// reported in the returned [`ToolOutput`].
    fn run(&self, program: &Path, args: &[String], input: &[u8]) -> Result<ToolOutput>;
}

/// [`ToolRunner`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create a new system runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[String], input: &[u8]) -> Result<ToolOutput> {
        let name = program.display().to_string();
        debug!("Executing command: {} {:?}", name, args);

        let spawn_error = |e: std::io::Error| ToolError::Spawn {
            program: name.clone(),
            reason: e.to_string(),
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(if input.is_empty() {
                Stdio::null()
            } else {
                Stdio::piped()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // stdin is fed from a scoped thread while stdout/stderr drain, so a
        // full pipe on either side cannot block the other.
        let stdin = child.stdin.take();
        let output = std::thread::scope(|scope| {
            if let Some(mut stdin) = stdin {
                scope.spawn(move || {
                    if let Err(e) = stdin.write_all(input) {
                        // The tool may stop reading early (e.g. after `-t`).
                        debug!("stdin closed early: {}", e);
                    }
                });
            }
            child.wait_with_output()
        })
        .map_err(spawn_error)?;

        if !output.status.success() {
            warn!("{} finished with {}", name, output.status);
        }

        Ok(ToolOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// A runner plus the configuration that tells it which programs to call,
/// and the classifier used for every locator resolved through it.
///
/// Cloning is cheap; every entity holds its own clone.
#[derive(Clone)]
pub struct Toolchain {
    config: Arc<ToolConfig>,
    runner: Arc<dyn ToolRunner>,
    classifier: Arc<Classifier>,
}

impl fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Toolchain")
            .field("config", &self.config)
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::system(ToolConfig::default())
    }
}

impl Toolchain {
    /// Toolchain that spawns real processes.
    #[must_use]
    pub fn system(config: ToolConfig) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner::new()))
    }

    /// Toolchain with a custom runner.
    #[must_use]
    pub fn with_runner(config: ToolConfig, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            config: Arc::new(config),
            runner,
            classifier: Arc::new(Classifier::default()),
        }
    }

    /// Replace the classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Load the configuration from disk and spawn real processes.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be loaded.
    pub fn from_environment() -> Result<Self> {
        Ok(Self::system(ToolConfig::load()?))
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// The active classifier.
    #[must_use]
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Run the media-fetching tool. The exit status is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    pub fn fetch(&self, args: &[String]) -> Result<ToolOutput> {
        self.runner.run(&self.config.yt_dlp_path, args, &[])
    }

    /// Run the media-fetching tool and require success.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or fails.
    pub fn fetch_checked(&self, args: &[String]) -> Result<ToolOutput> {
        self.fetch(args)?
            .into_success(&self.config.yt_dlp_path.display().to_string())
    }

    /// Run the transcoder over `input`. The exit status is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    pub fn transcode(&self, args: &[String], input: &[u8]) -> Result<ToolOutput> {
        self.runner.run(&self.config.ffmpeg_path, args, input)
    }

    /// Run the transcoder over `input` and require success.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or fails.
    pub fn transcode_checked(&self, args: &[String], input: &[u8]) -> Result<ToolOutput> {
        self.transcode(args, input)?
            .into_success(&self.config.ffmpeg_path.display().to_string())
    }

    /// Run the prober over `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    pub fn probe(&self, args: &[String], input: &[u8]) -> Result<ToolOutput> {
        self.runner.run(&self.config.ffprobe_path, args, input)
    }

    /// Run the prober over `input` and require success.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or fails.
    pub fn probe_checked(&self, args: &[String], input: &[u8]) -> Result<ToolOutput> {
        self.probe(args, input)?
            .into_success(&self.config.ffprobe_path.display().to_string())
    }
}

/// Build an owned argument vector from string slices.
pub(crate) fn args<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}
