use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Measures the playback length of an audio file.
///
/// Implementations never fail: any problem maps to `None`.
#[async_trait]
pub trait DurationProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Option<f64>;
}

/// Duration probe backed by `ffprobe`
#[derive(Debug, Clone)]
pub struct FfprobeDuration {
    program: String,
    timeout: Duration,
}

impl FfprobeDuration {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl Default for FfprobeDuration {
    fn default() -> Self {
        Self::new("ffprobe", Duration::from_secs(5))
    }
}

#[async_trait]
impl DurationProbe for FfprobeDuration {
    async fn probe(&self, path: &Path) -> Option<f64> {
        let mut command = Command::new(&self.program);
        command
            .args([
                "-v", "error",
                "-show_entries", "format=duration",
                "-of", "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        // The child is killed if the timeout drops the pending output
        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                debug!("{} unavailable for {}: {}", self.program, path.display(), e);
                return None;
            }
            Err(_) => {
                debug!("{} timed out after {:?} on {}", self.program, self.timeout, path.display());
                return None;
            }
        };

        if !output.status.success() {
            debug!("{} exited with {} on {}", self.program, output.status, path.display());
            return None;
        }

        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Probe used when duration measurement is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

#[async_trait]
impl DurationProbe for NoProbe {
    async fn probe(&self, _path: &Path) -> Option<f64> {
        None
    }
}

/// Parse the bare seconds value printed by ffprobe
pub fn parse_duration(output: &str) -> Option<f64> {
    output
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
}
