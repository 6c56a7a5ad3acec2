//! Application Coordinator
//!
//! Wires the scan loop, the one-shot read path and visit submission together
//! and plays the part of the presentation layer: status lines go to stderr,
//! records go to stdout as JSON.

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::capture::{FrameSource, RawFrame};
use crate::config::AppConfig;
use crate::extract::{ExtractedRecord, RecordEdit, RecordField};
use crate::feedback::play_confirmation;
use crate::scan::{
    read_once, PipelineOutput, ScanController, ScanEvent, ScanOutcome, ScanStatus,
};
use crate::submit::{VisitClient, VisitSubmission};
use crate::vision::{TesseractRecognizer, TextRecognizer};

/// Main application coordinator
pub struct KtpScannerApp {
    config: AppConfig,
    recognizer: Arc<dyn TextRecognizer>,
}

impl KtpScannerApp {
    /// Coordinator backed by the tesseract engine
    pub fn new(config: AppConfig) -> Self {
        let recognizer = Arc::new(TesseractRecognizer::new(&config.recognizer));
        Self::with_recognizer(config, recognizer)
    }

    pub fn with_recognizer(config: AppConfig, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { config, recognizer }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Warn early when tesseract lacks the configured language data
    pub async fn check_language(&self) {
        let tesseract = TesseractRecognizer::new(&self.config.recognizer);
        let language = &self.config.scan.language;
        match tesseract.available_languages().await {
            Ok(languages) if languages.iter().any(|l| l == language) => {
                info!("Tesseract language '{}' available", language);
            }
            Ok(languages) => warn!(
                "Tesseract has no '{}' language data (installed: {}), recognition will fail",
                language,
                languages.join(", ")
            ),
            Err(e) => warn!("{}", e),
        }
    }

    /// Run a scan session until a confident match or cancellation
    pub async fn scan<S: FrameSource>(&self, source: S, cancel: CancellationToken) -> ScanOutcome {
        let (events_tx, events_rx) = unbounded();
        let presenter = tokio::task::spawn_blocking(move || present_events(events_rx));

        let controller =
            ScanController::new(source, self.recognizer.clone(), &self.config.scan, events_tx);
        // The controller owns the only sender; the presenter ends with the session
        let outcome = controller.run(cancel).await;

        if let Err(e) = presenter.await {
            warn!("Status presenter failed: {}", e);
        }
        if matches!(outcome, ScanOutcome::Matched(_)) {
            play_confirmation(&self.config.feedback).await;
        }
        outcome
    }

    /// One-shot capture or upload; the record comes back even without a valid
    /// id number
    pub async fn read(&self, frame: RawFrame) -> Result<PipelineOutput> {
        let output = read_once(frame, self.recognizer.clone(), &self.config.scan.language)
            .await
            .context("Failed to read ID card image")?;
        if !output.record.is_confident() {
            warn!("No valid NIK read, check the record before submitting");
        }
        Ok(output)
    }

    /// Validate and submit a record. Returns the service's confirmation message.
    pub async fn submit(&self, record: &ExtractedRecord, purpose: &str) -> Result<String> {
        let visit = VisitSubmission::new(record, purpose).inspect_err(|e| {
            warn!(
                "Fill in {} first (--set FIELD=VALUE, --purpose TEXT)",
                e.missing().join(", ")
            );
        })?;
        let client = VisitClient::new(&self.config.submission)?;
        info!(
            "Submitting visit for {} ({}) to {}",
            visit.id_number(),
            visit.purpose(),
            client.endpoint()
        );

        match client.submit(&visit).await {
            Ok(message) => Ok(message),
            Err(e) => {
                // Record stays on stdout for a retry with `submit`
                warn!("Visit for {} not recorded: {}", visit.id_number(), e.detail());
                Err(e).context("Failed to record visit")
            }
        }
    }
}

/// Apply user corrections in order
pub fn apply_edits(record: &mut ExtractedRecord, edits: &[RecordEdit]) {
    for edit in edits {
        record.apply_edit(edit.clone());
    }
}

/// Human-readable form of a record, one labelled field per line
pub fn record_summary(record: &ExtractedRecord) -> String {
    RecordField::ALL
        .iter()
        .map(|field| {
            let value = record.get(*field);
            format!("{:<14}: {}", field.label(), if value.is_empty() { "-" } else { value })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turns session events into user-facing lines, dropping repeats of the
/// current status
#[derive(Debug, Default)]
pub struct StatusPrinter {
    last_status: Option<ScanStatus>,
}

impl StatusPrinter {
    pub fn render(&mut self, event: &ScanEvent) -> Option<String> {
        match event {
            ScanEvent::Started { .. } => {
                self.last_status = None;
                Some("Scanning... point the camera at the ID card.".to_string())
            }
            ScanEvent::Status(status) => {
                if self.last_status == Some(*status) {
                    return None;
                }
                self.last_status = Some(*status);
                Some(status.message().to_string())
            }
            ScanEvent::Matched(record) => Some(format!("ID card found: {}", record.id_number)),
            ScanEvent::Stopped => Some("Scan stopped.".to_string()),
        }
    }
}

fn present_events(events: Receiver<ScanEvent>) {
    let mut printer = StatusPrinter::default();
    for event in events {
        if let Some(line) = printer.render(&event) {
            eprintln!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RecognitionError, SubmissionError, ValidationError};
    use crate::vision::{EnhancedImage, RecognizedText};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedText(&'static str);

    #[async_trait]
    impl TextRecognizer for FixedText {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn recognize(
            &self,
            _image: &EnhancedImage,
            _language: &str,
        ) -> Result<RecognizedText, RecognitionError> {
            Ok(RecognizedText::from_output(self.0))
        }
    }

    fn quiet_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.scan.tick_interval_ms = 10;
        config.feedback.sound_enabled = false;
        config.submission.endpoint = "http://127.0.0.1:9".to_string();
        config
    }

    fn frame() -> RawFrame {
        RawFrame::from_image(&image::RgbaImage::from_pixel(3, 3, image::Rgba([255; 4])))
    }

    #[test]
    fn test_status_printer_drops_repeats() {
        let mut printer = StatusPrinter::default();
        let searching = ScanEvent::Status(ScanStatus::Searching);
        let close = ScanEvent::Status(ScanStatus::Close);

        assert!(printer.render(&searching).is_some());
        assert!(printer.render(&searching).is_none());
        assert_eq!(printer.render(&close).as_deref(), Some("Detecting... hold still!"));
        assert!(printer.render(&close).is_none());
        assert!(printer.render(&searching).is_some());
        assert_eq!(printer.render(&ScanEvent::Stopped).as_deref(), Some("Scan stopped."));
    }

    #[test]
    fn test_apply_edits_in_order() {
        let mut record = ExtractedRecord::default();
        let edits: Vec<RecordEdit> = ["nama=BUDI", "nama=SITI", "tanggal_lahir=1990-02-01"]
            .iter()
            .map(|e| e.parse().unwrap())
            .collect();
        apply_edits(&mut record, &edits);
        assert_eq!(record.full_name, "SITI");
        assert_eq!(record.birth_date, "01-02-1990");
    }

    #[test]
    fn test_record_summary_lists_every_field() {
        let record = ExtractedRecord {
            id_number: "3275010101900001".to_string(),
            full_name: "BUDI".to_string(),
            ..Default::default()
        };
        let summary = record_summary(&record);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "NIK           : 3275010101900001");
        assert_eq!(lines[1], "Nama          : BUDI");
        assert_eq!(lines[4], "Alamat        : -");
    }

    #[tokio::test]
    async fn test_scan_returns_matching_frame() {
        let app = KtpScannerApp::with_recognizer(
            quiet_config(),
            Arc::new(FixedText("NIK : 3275010101900001\nNama : BUDI")),
        );
        let outcome = tokio::time::timeout(
            Duration::from_secs(10),
            app.scan(|| Some(frame()), CancellationToken::new()),
        )
        .await
        .unwrap();

        let ScanOutcome::Matched(found) = outcome else {
            panic!("expected a match");
        };
        assert_eq!(found.record.full_name, "BUDI");
        assert_eq!(found.frame.decode().unwrap().dimensions(), (3, 3));
    }

    #[tokio::test]
    async fn test_scan_cancelled_before_start() {
        let app = KtpScannerApp::with_recognizer(quiet_config(), Arc::new(FixedText("")));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = app.scan(|| Some(frame()), cancel).await;
        assert!(matches!(outcome, ScanOutcome::Stopped));
    }

    #[tokio::test]
    async fn test_read_keeps_partial_record() {
        let app =
            KtpScannerApp::with_recognizer(quiet_config(), Arc::new(FixedText("Nama : SITI")));
        let output = app.read(frame()).await.unwrap();
        assert_eq!(output.record.full_name, "SITI");
        assert!(!output.record.is_confident());
    }

    #[tokio::test]
    async fn test_read_undecodable_frame_fails() {
        let app = KtpScannerApp::with_recognizer(quiet_config(), Arc::new(FixedText("")));
        let frame = RawFrame::from_encoded(b"not an image".to_vec());
        let err = app.read(frame).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read ID card image"));
    }

    #[tokio::test]
    async fn test_submit_validates_before_network() {
        let app = KtpScannerApp::with_recognizer(quiet_config(), Arc::new(FixedText("")));
        let record = ExtractedRecord {
            id_number: "3275010101900001".to_string(),
            ..Default::default()
        };
        let err = app.submit(&record, "Membaca").await.unwrap_err();
        assert_eq!(err.to_string(), "required fields missing: Nama");
        assert!(err.downcast_ref::<ValidationError>().is_some());
    }

    #[tokio::test]
    async fn test_submit_unreachable_service_keeps_cause() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = quiet_config();
        config.submission.endpoint = format!("http://{addr}");
        let app = KtpScannerApp::with_recognizer(config, Arc::new(FixedText("")));
        let record = ExtractedRecord {
            id_number: "3275010101900001".to_string(),
            full_name: "BUDI".to_string(),
            ..Default::default()
        };

        let err = app.submit(&record, "Membaca").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to record visit");
        assert!(matches!(
            err.downcast_ref::<SubmissionError>(),
            Some(SubmissionError::Transport(_))
        ));
    }
}
