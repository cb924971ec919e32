//! External reliability predictor.
//!
//! The production predictor is a script run once per submission with the
//! article text as its only argument. It prints one JSON object on stdout:
//! `{"overall_score": 72, "confidence": 0.91}` on success or
//! `{"error": "..."}` on failure.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use firenews_common::{FireError, Result, MAX_SCORE, MIN_SCORE};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Prediction {
    pub overall_score: i64,
    pub confidence: f64,
}

#[async_trait]
pub trait Predictor: Send + Sync {
    /// Score a piece of text. Any failure is `FireError::Prediction`.
    async fn predict(&self, text: &str) -> Result<Prediction>;
}

/// Runs `<python> <script> <text>` and reads the JSON it prints.
pub struct ProcessPredictor {
    python_path: String,
    script_path: PathBuf,
}

impl ProcessPredictor {
    pub fn new(python_path: impl Into<String>, script_path: impl Into<PathBuf>) -> Self {
        Self {
            python_path: python_path.into(),
            script_path: script_path.into(),
        }
    }
}

#[async_trait]
impl Predictor for ProcessPredictor {
    async fn predict(&self, text: &str) -> Result<Prediction> {
        debug!(
            python = %self.python_path,
            script = %self.script_path.display(),
            chars = text.len(),
            "Invoking predictor"
        );

        let output = Command::new(&self.python_path)
            .arg(&self.script_path)
            .arg(text)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                FireError::Prediction(format!(
                    "failed to start {} {}: {e}",
                    self.python_path,
                    self.script_path.display()
                ))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            warn!(status = %output.status, "Predictor exited unsuccessfully");
            return Err(FireError::Prediction(format!(
                "predictor exited with {}: {}{}",
                output.status,
                stdout.trim(),
                stderr.trim()
            )));
        }

        parse_output(&stdout)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PredictorOutput {
    Failure { error: String },
    Score(Prediction),
}

/// Parse predictor stdout. Only the last line that looks like a JSON object
/// is considered, so stray log lines before it are ignored.
pub fn parse_output(stdout: &str) -> Result<Prediction> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with('{'))
        .ok_or_else(|| FireError::Prediction(format!("no JSON in predictor output: {stdout:?}")))?;

    let parsed: PredictorOutput = serde_json::from_str(line).map_err(|e| {
        FireError::Prediction(format!("failed to parse predictor output: {e}, output: {line}"))
    })?;

    let prediction = match parsed {
        PredictorOutput::Failure { error } => {
            return Err(FireError::Prediction(format!("predictor reported: {error}")))
        }
        PredictorOutput::Score(prediction) => prediction,
    };

    if !(MIN_SCORE..=MAX_SCORE).contains(&prediction.overall_score) {
        return Err(FireError::Prediction(format!(
            "score {} outside 0..=100",
            prediction.overall_score
        )));
    }
    if !(0.0..=1.0).contains(&prediction.confidence) {
        return Err(FireError::Prediction(format!(
            "confidence {} outside [0, 1]",
            prediction.confidence
        )));
    }
    Ok(prediction)
}
