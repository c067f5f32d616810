//! Zombie detection backends.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::config::MonitoringConfig;
use crate::monitoring::MonitoringError;

/// A source of zombie counts for the current frame.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self) -> Result<u32, MonitoringError>;
}

/// Runs an external command and reads the count from its stdout.
///
/// Accepted output is a bare integer or `{"count": n}`.
#[derive(Debug, Clone)]
pub struct CommandDetector {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandDetector {
    pub fn new(command: &[String], timeout: Duration) -> Result<Self, MonitoringError> {
        let (program, args) = command.split_first().ok_or(MonitoringError::NoDetector)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }

    pub fn from_config(config: &MonitoringConfig) -> Result<Self, MonitoringError> {
        Self::new(
            &config.detector_command,
            Duration::from_millis(config.detector_timeout_ms),
        )
    }
}

#[async_trait]
impl Detector for CommandDetector {
    async fn detect(&self) -> Result<u32, MonitoringError> {
        let run = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| MonitoringError::DetectorTimeout(self.timeout))?
            .map_err(MonitoringError::DetectorSpawn)?;

        if !output.status.success() {
            return Err(MonitoringError::DetectorFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_count(&String::from_utf8_lossy(&output.stdout))
    }
}

#[derive(Deserialize)]
struct CountReport {
    count: u32,
}

pub fn parse_count(stdout: &str) -> Result<u32, MonitoringError> {
    let trimmed = stdout.trim();
    if let Ok(count) = trimmed.parse::<u32>() {
        return Ok(count);
    }
    serde_json::from_str::<CountReport>(trimmed)
        .map(|report| report.count)
        .map_err(|_| MonitoringError::InvalidOutput(trimmed.to_string()))
}
