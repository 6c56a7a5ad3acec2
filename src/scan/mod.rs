//! Scan Controller
//!
//! Drives the continuous capture -> enhance -> recognize -> extract loop on a
//! fixed tick until a card number is read with confidence or the session is
//! cancelled.
//!
//! At most one pipeline run is in flight per session. The controller owns the
//! in-flight slot and checks it on every tick: while a run is pending, ticks are
//! skipped outright rather than queued, so a slow recognizer can never build up
//! a backlog. A run that is still in flight when the session stops is left to
//! finish in the background and its result is discarded.
//!
//! Known limitation: recognition calls have no timeout, so a hung engine stalls
//! the session until it is cancelled.

pub mod messages;
pub mod pipeline;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, trace, warn, Instrument};

use crate::capture::{FrameSource, RawFrame};
use crate::config::ScanSettings;
use crate::error::PipelineError;
use crate::extract::ExtractedRecord;
use crate::vision::{RecognizedText, TextRecognizer};

pub use messages::{ScanEvent, ScanStatus};
pub use pipeline::{read_once, run_pipeline, PipelineOutput};
pub use session::ScanSession;

type PipelineResult = Result<PipelineOutput, PipelineError>;

/// A confident match. The originating frame is moved here and nowhere else.
#[derive(Debug)]
pub struct ScanMatch {
    pub record: ExtractedRecord,
    pub frame: RawFrame,
    pub text: RecognizedText,
}

/// How a scan session ended
#[derive(Debug)]
pub enum ScanOutcome {
    Matched(ScanMatch),
    Stopped,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A pipeline run was already in flight
    SkippedBusy,
    /// The frame source had nothing to give
    NoFrame,
    /// A new pipeline run started
    Dispatched,
    /// The session is no longer scanning
    Inactive,
}

/// Counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub ticks: u64,
    pub skipped_busy: u64,
    pub no_frame: u64,
    pub dispatched: u64,
    pub failed: u64,
}

/// Classify a non-matching tick for user feedback. Heuristic only: the literal
/// `NIK` label or a long digit run means the card is in view.
pub fn classify_progress(text: &RecognizedText, close_digit_run: usize) -> ScanStatus {
    let text = text.text();
    if text.contains("NIK") || longest_digit_run(&text) >= close_digit_run {
        ScanStatus::Close
    } else {
        ScanStatus::Searching
    }
}

fn longest_digit_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c.is_ascii_digit() {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Scan loop for one session
pub struct ScanController<S: FrameSource> {
    source: S,
    recognizer: Arc<dyn TextRecognizer>,
    language: Arc<str>,
    tick_interval: Duration,
    close_digit_run: usize,
    session: Arc<ScanSession>,
    events: Sender<ScanEvent>,
    /// Busy flag: `Some` while a pipeline run is pending
    in_flight: Option<JoinHandle<PipelineResult>>,
    stats: ScanStats,
}

impl<S: FrameSource> ScanController<S> {
    /// Create a controller with a fresh idle session
    pub fn new(
        source: S,
        recognizer: Arc<dyn TextRecognizer>,
        settings: &ScanSettings,
        events: Sender<ScanEvent>,
    ) -> Self {
        Self {
            source,
            recognizer,
            language: Arc::from(settings.language.as_str()),
            tick_interval: settings.tick_interval(),
            close_digit_run: settings.close_digit_run,
            session: Arc::new(ScanSession::new()),
            events,
            in_flight: None,
            stats: ScanStats::default(),
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> Arc<ScanSession> {
        self.session.clone()
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// One-line summary of the session counters
    pub fn stats_summary(&self) -> String {
        let stats = self.stats();
        format!(
            "{} ticks, {} frames processed, {} failed, {} skipped while busy, {} without a frame",
            stats.ticks, stats.dispatched, stats.failed, stats.skipped_busy, stats.no_frame
        )
    }

    /// Run until a confident match or cancellation
    pub async fn run(self, cancel: CancellationToken) -> ScanOutcome {
        let span = info_span!("scan", session = %self.session.id());
        self.run_loop(cancel).instrument(span).await
    }

    async fn run_loop(mut self, cancel: CancellationToken) -> ScanOutcome {
        if !self.session.begin() {
            warn!("Session is not idle, refusing to scan");
            return ScanOutcome::Stopped;
        }
        info!(
            "Scanning every {:?} with {} ({})",
            self.tick_interval,
            self.recognizer.name(),
            self.language
        );
        self.emit(ScanEvent::Started {
            session: self.session.id(),
        });

        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    return self.shutdown();
                }
                joined = join_in_flight(&mut self.in_flight) => {
                    self.in_flight = None;
                    if let Some(found) = self.on_pipeline_done(joined) {
                        info!("Card matched after {}", self.stats_summary());
                        return ScanOutcome::Matched(found);
                    }
                }
                _ = ticker.tick() => {
                    if self.on_tick() == TickOutcome::Inactive {
                        return self.shutdown();
                    }
                }
            }
        }
    }

    /// One tick of the scheduler
    fn on_tick(&mut self) -> TickOutcome {
        self.stats.ticks += 1;

        if !self.session.is_scanning() {
            return TickOutcome::Inactive;
        }
        if self.in_flight.is_some() {
            self.stats.skipped_busy += 1;
            trace!("Previous frame still processing, skipping tick");
            return TickOutcome::SkippedBusy;
        }
        let Some(frame) = self.source.capture_frame() else {
            self.stats.no_frame += 1;
            trace!("No frame available");
            return TickOutcome::NoFrame;
        };

        self.stats.dispatched += 1;
        self.in_flight = Some(tokio::spawn(run_pipeline(
            frame,
            self.recognizer.clone(),
            self.language.clone(),
        )));
        TickOutcome::Dispatched
    }

    /// Handle a finished pipeline run. The caller has already cleared the
    /// in-flight slot.
    fn on_pipeline_done(
        &mut self,
        joined: Result<PipelineResult, JoinError>,
    ) -> Option<ScanMatch> {
        if !self.session.is_scanning() {
            debug!("Session left scanning, discarding pipeline result");
            return None;
        }

        let output = match joined {
            Ok(Ok(output)) => output,
            Ok(Err(PipelineError::Decode(e))) => {
                self.stats.failed += 1;
                debug!("Skipping undecodable frame: {}", e);
                return None;
            }
            Ok(Err(PipelineError::Recognition(e))) => {
                self.stats.failed += 1;
                warn!("Recognizer {} failed: {}", self.recognizer.name(), e.message());
                return None;
            }
            Ok(Err(e)) => {
                self.stats.failed += 1;
                warn!("Scan tick failed: {}", e);
                return None;
            }
            Err(e) => {
                self.stats.failed += 1;
                warn!("Pipeline task failed: {}", e);
                return None;
            }
        };

        if output.record.is_confident() {
            if !self.session.mark_matched() {
                return None;
            }
            info!("Card number {} read", output.record.id_number);
            self.emit(ScanEvent::Matched(output.record.clone()));
            return Some(ScanMatch {
                record: output.record,
                frame: output.frame,
                text: output.text,
            });
        }

        let status = classify_progress(&output.text, self.close_digit_run);
        trace!("Interim status {:?}", status);
        self.emit(ScanEvent::Status(status));
        None
    }

    fn shutdown(&mut self) -> ScanOutcome {
        self.session.stop();
        if self.in_flight.take().is_some() {
            debug!("Leaving in-flight pipeline run to finish unobserved");
        }
        info!("Scan stopped after {}", self.stats_summary());
        self.emit(ScanEvent::Stopped);
        ScanOutcome::Stopped
    }

    fn emit(&self, event: ScanEvent) {
        // A closed presentation channel must not stop the scan
        let _ = self.events.send(event);
    }
}

/// Resolve the in-flight run, or never if there is none
async fn join_in_flight(
    slot: &mut Option<JoinHandle<PipelineResult>>,
) -> Result<PipelineResult, JoinError> {
    match slot {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
