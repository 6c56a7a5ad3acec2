//! One enhance -> recognize -> extract run

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace};

use crate::capture::RawFrame;
use crate::error::PipelineError;
use crate::extract::{extract, ExtractedRecord};
use crate::vision::{enhance, RecognizedText, TextRecognizer};

/// Everything one pipeline run produced
#[derive(Debug)]
pub struct PipelineOutput {
    /// Frame the run started from; retained only if it matched
    pub frame: RawFrame,
    pub text: RecognizedText,
    pub record: ExtractedRecord,
}

/// Run the pipeline on one frame. Enhancement goes to the blocking pool,
/// recognition is awaited.
pub async fn run_pipeline(
    frame: RawFrame,
    recognizer: Arc<dyn TextRecognizer>,
    language: Arc<str>,
) -> Result<PipelineOutput, PipelineError> {
    let start = Instant::now();

    let (frame, enhanced) = tokio::task::spawn_blocking(move || {
        let enhanced = enhance(&frame);
        (frame, enhanced)
    })
    .await?;
    let enhanced = enhanced?;

    let text = recognizer.recognize(&enhanced, &language).await?;
    drop(enhanced);

    if text.is_empty() {
        trace!("Recognizer returned no text");
    }
    let record = extract(&text);

    debug!(
        "Pipeline ({}) complete in {:?} ({:?} since capture): {} lines, id number {}",
        recognizer.name(),
        start.elapsed(),
        frame.timestamp.elapsed(),
        text.lines().len(),
        if record.is_confident() { "found" } else { "missing" }
    );

    Ok(PipelineOutput {
        frame,
        text,
        record,
    })
}

/// Manual capture or upload: a single run whose record is returned whether or
/// not the id number is valid, for the user to correct
pub async fn read_once(
    frame: RawFrame,
    recognizer: Arc<dyn TextRecognizer>,
    language: &str,
) -> Result<PipelineOutput, PipelineError> {
    run_pipeline(frame, recognizer, Arc::from(language)).await
}
