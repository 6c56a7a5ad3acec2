//! Confirmation tone played when a card is matched

use std::time::Duration;

use anyhow::{Context, Result};
use rodio::source::{SineWave, Source};
use rodio::{OutputStream, Sink};
use tracing::{debug, warn};

use crate::config::FeedbackConfig;

/// A short sine beep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration: Duration,
    pub volume: f32,
}

impl Tone {
    /// `None` when sound is disabled or the tone would be inaudible
    pub fn from_config(config: &FeedbackConfig) -> Option<Self> {
        if !config.sound_enabled || config.tone_ms == 0 || config.tone_hz <= 0.0 {
            return None;
        }
        Some(Self {
            frequency_hz: config.tone_hz,
            duration: Duration::from_millis(config.tone_ms),
            volume: config.volume.clamp(0.0, 1.0),
        })
    }

    /// Blocks until the tone has finished
    fn play_blocking(&self) -> Result<()> {
        let (_stream, handle) =
            OutputStream::try_default().context("No audio output device")?;
        let sink = Sink::try_new(&handle).context("Failed to open audio sink")?;
        sink.append(
            SineWave::new(self.frequency_hz)
                .take_duration(self.duration)
                .amplify(self.volume),
        );
        sink.sleep_until_end();
        Ok(())
    }
}

/// Play the confirmation tone if enabled. Audio failures never reach the caller.
pub async fn play_confirmation(config: &FeedbackConfig) {
    let Some(tone) = Tone::from_config(config) else {
        debug!("Confirmation tone disabled");
        return;
    };

    match tokio::task::spawn_blocking(move || tone.play_blocking()).await {
        Ok(Ok(())) => debug!("Played {} Hz confirmation tone", tone.frequency_hz),
        Ok(Err(e)) => warn!("Could not play confirmation tone: {:#}", e),
        Err(e) => warn!("Confirmation tone task failed: {}", e),
    }
}
