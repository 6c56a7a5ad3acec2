//! Message types sent from the scan loop to the presentation layer

use uuid::Uuid;

use crate::extract::ExtractedRecord;

/// Interim feedback while no confident match exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// Nothing resembling a card number yet
    Searching,
    /// Text looks like a card, the number is almost readable
    Close,
}

impl ScanStatus {
    /// Text shown to the user
    pub fn message(&self) -> &'static str {
        match self {
            ScanStatus::Searching => "Searching for ID card... position the card clearly.",
            ScanStatus::Close => "Detecting... hold still!",
        }
    }
}

/// Events emitted by a scan session
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// Session entered `scanning`
    Started { session: Uuid },
    /// Interim progress for one completed tick
    Status(ScanStatus),
    /// Confident match, scanning has ended
    Matched(ExtractedRecord),
    /// Session was cancelled
    Stopped,
}
