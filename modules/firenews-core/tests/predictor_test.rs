//! Process predictor against throwaway shell scripts.
#![cfg(unix)]

use std::io::Write;

use firenews_common::FireError;
use firenews_core::{Predictor, ProcessPredictor};
use tempfile::NamedTempFile;

fn script(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{body}").unwrap();
    file
}

#[tokio::test]
async fn reads_score_from_stdout() {
    let file = script(r#"echo 'loading model...'; echo '{"overall_score": 64, "confidence": 0.28}'"#);
    let predictor = ProcessPredictor::new("sh", file.path());

    let prediction = predictor.predict("some article text").await.unwrap();
    assert_eq!(prediction.overall_score, 64);
    assert_eq!(prediction.confidence, 0.28);
}

#[tokio::test]
async fn passes_text_as_single_argument() {
    let file = script(r#"[ "$1" = "two words" ] && echo '{"overall_score": 1, "confidence": 0.98}'"#);
    let predictor = ProcessPredictor::new("sh", file.path());

    assert_eq!(predictor.predict("two words").await.unwrap().overall_score, 1);
}

#[tokio::test]
async fn error_object_is_prediction_error() {
    let file = script(r#"echo '{"error": "Prediction failed: out of memory"}'"#);
    let predictor = ProcessPredictor::new("sh", file.path());

    let err = predictor.predict("text").await.unwrap_err();
    assert!(matches!(err, FireError::Prediction(m) if m.contains("out of memory")));
}

#[tokio::test]
async fn non_zero_exit_carries_output() {
    let file = script("echo 'Traceback: boom' >&2; exit 3");
    let predictor = ProcessPredictor::new("sh", file.path());

    let err = predictor.predict("text").await.unwrap_err();
    assert!(matches!(err, FireError::Prediction(m) if m.contains("boom")));
}

#[tokio::test]
async fn missing_interpreter_is_prediction_error() {
    let predictor = ProcessPredictor::new("/nonexistent/python3", "predict.py");
    assert!(matches!(
        predictor.predict("text").await,
        Err(FireError::Prediction(_))
    ));
}
