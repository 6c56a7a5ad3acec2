//! Scan session state machine
//!
//! `idle -> scanning -> matched | stopped`. Both end states are final; scanning
//! again needs a fresh session.

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// Lifecycle of one visit to the capture view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Scanning,
    Matched,
    Stopped,
}

/// Shared session state, read by the presentation layer and advanced by the
/// scan controller
#[derive(Debug)]
pub struct ScanSession {
    id: Uuid,
    state: RwLock<SessionState>,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: RwLock::new(SessionState::Idle),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn is_scanning(&self) -> bool {
        self.state() == SessionState::Scanning
    }

    /// `idle -> scanning`
    pub fn begin(&self) -> bool {
        self.transition(&[SessionState::Idle], SessionState::Scanning)
    }

    /// `scanning -> matched`
    pub fn mark_matched(&self) -> bool {
        self.transition(&[SessionState::Scanning], SessionState::Matched)
    }

    /// `idle | scanning -> stopped`. A matched session keeps its result.
    pub fn stop(&self) -> bool {
        self.transition(
            &[SessionState::Idle, SessionState::Scanning],
            SessionState::Stopped,
        )
    }

    fn transition(&self, from: &[SessionState], to: SessionState) -> bool {
        let mut state = self.state.write();
        if !from.contains(&*state) {
            debug!(session = %self.id, "Ignoring transition {:?} -> {:?}", *state, to);
            return false;
        }
        debug!(session = %self.id, "Session {:?} -> {:?}", *state, to);
        *state = to;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let session = ScanSession::new();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.is_scanning());
    }

    #[test]
    fn test_scan_then_match() {
        let session = ScanSession::new();
        assert!(session.begin());
        assert!(session.is_scanning());
        assert!(session.mark_matched());
        assert_eq!(session.state(), SessionState::Matched);
        // Matched is final
        assert!(!session.stop());
        assert!(!session.begin());
        assert_eq!(session.state(), SessionState::Matched);
    }

    #[test]
    fn test_stopped_never_matches_or_resumes() {
        let session = ScanSession::new();
        session.begin();
        assert!(session.stop());
        assert!(!session.mark_matched());
        assert!(!session.begin());
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn test_match_requires_scanning() {
        let session = ScanSession::new();
        assert!(!session.mark_matched());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        assert_ne!(ScanSession::new().id(), ScanSession::new().id());
    }
}
