//! Frame Capture Layer
//!
//! The camera is an external collaborator: anything that can hand over a still
//! frame on demand. Capture is synchronous and cheap; a source that is not ready
//! yet returns `None` and the scan loop simply waits for the next tick.

pub mod frame;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

pub use frame::RawFrame;

/// Anything that can produce a still frame on demand
pub trait FrameSource: Send {
    /// Grab the current frame, or `None` if the camera is not ready
    fn capture_frame(&mut self) -> Option<RawFrame>;
}

impl<F> FrameSource for F
where
    F: FnMut() -> Option<RawFrame> + Send,
{
    fn capture_frame(&mut self) -> Option<RawFrame> {
        self()
    }
}

/// Reads the latest still from an image file that an external camera tool keeps
/// overwriting (e.g. `fswebcam --loop 1 snapshot.jpg`)
#[derive(Debug, Clone)]
pub struct SnapshotFileSource {
    path: PathBuf,
}

impl SnapshotFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for SnapshotFileSource {
    fn capture_frame(&mut self) -> Option<RawFrame> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => {
                debug!("Snapshot {:?} is empty, camera still writing", self.path);
                None
            }
            Ok(bytes) => Some(RawFrame::from_encoded(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Snapshot {:?} not there yet", self.path);
                None
            }
            Err(e) => {
                warn!("Failed to read snapshot {:?}: {}", self.path, e);
                None
            }
        }
    }
}
