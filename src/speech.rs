//! Boundary to the host's speech synthesizer.
//!
//! The engine submits one [`Utterance`] at a time through a [`Speaker`]. The
//! speaker reports how each utterance ended by sending a [`SpeechEvent`]
//! that the host feeds back into
//! [`PlaybackEngine::handle_speech`](crate::playback::PlaybackEngine::handle_speech).

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::Result;
use crate::settings::VoiceSettings;

/// Identifies one submitted utterance so late completions can be told apart
/// from current ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub voice: VoiceSettings,
}

/// Why an utterance did not finish.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    #[error("canceled")]
    Canceled,
    #[error("interrupted")]
    Interrupted,
    #[error("synthesis failed: {0}")]
    Synthesis(String),
}

impl SpeechError {
    /// Cancellation and interruption follow from [`Speaker::cancel`]; they
    /// are not faults of the utterance.
    pub fn is_self_inflicted(&self) -> bool {
        matches!(self, Self::Canceled | Self::Interrupted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    Finished,
    Failed(SpeechError),
}

/// Completion notice for one utterance. Exactly one is expected per
/// successful [`Speaker::speak`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechEvent {
    pub id: UtteranceId,
    pub outcome: SpeechOutcome,
}

impl SpeechEvent {
    pub fn finished(id: UtteranceId) -> Self {
        Self {
            id,
            outcome: SpeechOutcome::Finished,
        }
    }

    pub fn failed(id: UtteranceId, error: SpeechError) -> Self {
        Self {
            id,
            outcome: SpeechOutcome::Failed(error),
        }
    }
}

/// A speech synthesizer.
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Start speaking. Returns once the utterance is queued; completion is
    /// reported separately as a [`SpeechEvent`]. An immediate rejection is an
    /// [`Error::Utterance`](crate::Error::Utterance).
    async fn speak(&self, utterance: Utterance) -> Result<()>;

    /// Abort the current utterance, if any. Speakers should report the
    /// aborted utterance as [`SpeechError::Canceled`].
    async fn cancel(&self);
}
