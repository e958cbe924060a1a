use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, instrument, warn};

use super::cache::SentenceCache;
use super::update::{PlaybackConfig, PlaybackState, PlaybackUpdate, Position};
use crate::epub::ChapterDescriptor;
use crate::error::{Error, Result};
use crate::library::{BlobStore, BookId, BookPlaybackState, RecordStore, load_chapter_sentences};
use crate::settings::VoiceSettings;
use crate::speech::{SpeechEvent, SpeechOutcome, Speaker, Utterance, UtteranceId};

/// Sentence-by-sentence read-aloud of one book at a time.
///
/// The engine owns the cursor (chapter and sentence index), the sentence
/// cache and the lifecycle state. Every state or cursor change is published
/// as a [`PlaybackUpdate`] on the channel returned by [`new`](Self::new).
///
/// Speech completions arrive from the host through
/// [`handle_speech`](Self::handle_speech) (or [`drive`](Self::drive)). At most
/// one utterance is in flight; a completion for any other utterance is stale
/// and ignored.
pub struct PlaybackEngine {
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn RecordStore>,
    speaker: Arc<dyn Speaker>,
    config: PlaybackConfig,
    voice: VoiceSettings,

    book_id: Option<BookId>,
    chapters: Vec<ChapterDescriptor>,
    cache: SentenceCache,
    chap_idx: usize,
    sent_idx: usize,
    state: PlaybackState,

    in_flight: Option<UtteranceId>,
    next_utterance: u64,
    updates: Option<UnboundedSender<PlaybackUpdate>>,
}

impl PlaybackEngine {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn RecordStore>,
        speaker: Arc<dyn Speaker>,
        config: PlaybackConfig,
    ) -> (Self, UnboundedReceiver<PlaybackUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cache = SentenceCache::new(config.empty_chapter_placeholder.clone());
        let engine = Self {
            blobs,
            records,
            speaker,
            config,
            voice: VoiceSettings::default(),
            book_id: None,
            chapters: Vec::new(),
            cache,
            chap_idx: 0,
            sent_idx: 0,
            state: PlaybackState::Idle,
            in_flight: None,
            next_utterance: 0,
            updates: Some(tx),
        };
        (engine, rx)
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn book_id(&self) -> Option<BookId> {
        self.book_id
    }

    pub fn chapters(&self) -> &[ChapterDescriptor] {
        &self.chapters
    }

    pub fn voice(&self) -> &VoiceSettings {
        &self.voice
    }

    /// Takes effect from the next utterance.
    pub fn set_voice(&mut self, voice: VoiceSettings) {
        self.voice = voice;
    }

    /// Load a book's chapters and restore its saved position.
    ///
    /// Ends in [`PlaybackState::Stopped`]. An unknown book leaves the engine
    /// idle and fails with [`Error::BookNotFound`].
    #[instrument(skip(self))]
    pub async fn open(&mut self, book_id: BookId) -> Result<()> {
        self.cancel_speech().await;
        self.cache.clear();
        self.book_id = Some(book_id);
        self.set_state(PlaybackState::Loading);

        let loaded = self.load_session(book_id).await;
        let (chapters, saved) = match loaded {
            Ok(session) => session,
            Err(e) => {
                self.book_id = None;
                self.chapters.clear();
                self.chap_idx = 0;
                self.sent_idx = 0;
                self.set_state(PlaybackState::Idle);
                return Err(e);
            }
        };

        self.chapters = chapters;
        self.chap_idx = self.clamp_chapter(saved.last_chapter_index);
        self.sent_idx = saved.last_sentence_index;
        debug!(
            chapters = self.chapters.len(),
            chapter = self.chap_idx,
            sentence = self.sent_idx,
            "opened"
        );
        self.set_state(PlaybackState::Stopped);
        Ok(())
    }

    async fn load_session(
        &self,
        book_id: BookId,
    ) -> Result<(Vec<ChapterDescriptor>, BookPlaybackState)> {
        let record = self
            .records
            .book(book_id)
            .await?
            .ok_or(Error::BookNotFound(book_id))?;
        let chapters = self.records.chapters(book_id).await?;
        Ok((chapters, record.position))
    }

    /// Start or resume from the cursor. Only acts when paused or stopped.
    pub async fn play(&mut self) {
        if !matches!(self.state, PlaybackState::Paused | PlaybackState::Stopped) {
            return;
        }
        self.set_state(PlaybackState::Playing);
        self.advance().await;
    }

    /// Silence speech and keep the cursor. Only acts while playing.
    pub async fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.cancel_speech().await;
        self.set_state(PlaybackState::Paused);
    }

    /// Silence speech and persist the cursor.
    pub async fn stop(&mut self) {
        self.cancel_speech().await;
        if !self.state.is_ready() {
            return;
        }
        self.set_state(PlaybackState::Stopped);
        self.persist().await;
    }

    /// Move the cursor. The chapter is clamped to the book; the sentence is
    /// taken as given and bounded once its chapter is loaded. Playback
    /// continues from the new cursor if it was running.
    pub async fn jump_to(&mut self, chap_idx: usize, sent_idx: usize) {
        if !self.state.is_ready() {
            return;
        }
        let was_playing = self.state == PlaybackState::Playing;
        self.cancel_speech().await;
        self.chap_idx = self.clamp_chapter(chap_idx);
        self.sent_idx = sent_idx;
        self.emit();
        if was_playing {
            self.advance().await;
        }
    }

    /// Back to the first sentence of the book.
    pub async fn restart(&mut self) {
        self.jump_to(0, 0).await;
    }

    /// Back to the first sentence of the current chapter.
    pub async fn rewind(&mut self) {
        self.jump_to(self.chap_idx, 0).await;
    }

    /// Start of the next chapter. On the last chapter the cursor stays put.
    pub async fn forward(&mut self) {
        if self.chapters.is_empty() {
            return;
        }
        let (chap_idx, sent_idx) = if self.chap_idx + 1 < self.chapters.len() {
            (self.chap_idx + 1, 0)
        } else {
            (self.chap_idx, self.sent_idx)
        };
        self.jump_to(chap_idx, sent_idx).await;
    }

    /// Persist the cursor without touching playback. A no-op without a book.
    pub async fn save_position(&self) -> Result<()> {
        let Some(book_id) = self.book_id else {
            return Ok(());
        };
        self.records
            .save_position(
                book_id,
                BookPlaybackState::new(self.chap_idx, self.sent_idx),
            )
            .await
    }

    /// Current cursor, chapter title and the sentence at the cursor (empty if
    /// its chapter is not cached).
    pub fn position(&self) -> Position {
        Position {
            chap_idx: self.chap_idx,
            sent_idx: self.sent_idx,
            chapter_title: self.chapter_title(),
            sentence: self.current_sentence(),
        }
    }

    /// Silence speech, return to idle and detach the update channel.
    pub async fn destroy(&mut self) {
        self.cancel_speech().await;
        self.cache.clear();
        self.set_state(PlaybackState::Idle);
        self.updates = None;
    }

    /// Feed one speech completion into the engine.
    pub async fn handle_speech(&mut self, event: SpeechEvent) {
        if self.in_flight != Some(event.id) {
            debug!(utterance = %event.id, "stale speech event");
            return;
        }
        self.in_flight = None;

        match event.outcome {
            SpeechOutcome::Finished => {
                if self.state != PlaybackState::Playing {
                    return;
                }
                self.sent_idx += 1;
                self.emit();
                let interval = self.config.checkpoint_interval;
                if interval > 0 && self.sent_idx % interval == 0 {
                    self.persist().await;
                }
                self.advance().await;
            }
            SpeechOutcome::Failed(e) if e.is_self_inflicted() => {
                debug!(utterance = %event.id, error = %e, "speech canceled");
            }
            SpeechOutcome::Failed(e) => {
                warn!(
                    chapter = self.chap_idx,
                    sentence = self.sent_idx,
                    error = %e,
                    "utterance failed; skipping sentence"
                );
                if self.state != PlaybackState::Playing {
                    return;
                }
                self.sent_idx += 1;
                self.advance().await;
            }
        }
    }

    /// Process speech events until playback stops waiting on one.
    ///
    /// Returns when the engine leaves [`PlaybackState::Playing`], has
    /// nothing in flight, or the event channel closes.
    pub async fn drive(&mut self, events: &mut UnboundedReceiver<SpeechEvent>) {
        while self.state == PlaybackState::Playing && self.in_flight.is_some() {
            let Some(event) = events.recv().await else {
                break;
            };
            self.handle_speech(event).await;
        }
    }

    /// Speak the sentence at the cursor, moving past exhausted or unreadable
    /// chapters first.
    async fn advance(&mut self) {
        loop {
            if self.state != PlaybackState::Playing {
                return;
            }
            if self.chapters.is_empty() {
                self.set_state(PlaybackState::Stopped);
                return;
            }

            let chap_idx = self.chap_idx;
            let has_next = chap_idx + 1 < self.chapters.len();
            let fresh = self.chapter_loader(chap_idx);
            let sentences = match self.cache.load(chap_idx, fresh).await {
                Ok(sentences) => sentences,
                Err(e) => {
                    warn!(chapter = chap_idx, error = %e, "skipping unreadable chapter");
                    if has_next {
                        self.chap_idx += 1;
                        self.sent_idx = 0;
                        self.emit();
                        continue;
                    }
                    self.set_state(PlaybackState::Stopped);
                    return;
                }
            };

            if self.sent_idx >= sentences.len() {
                if has_next {
                    self.chap_idx += 1;
                    self.sent_idx = 0;
                    self.emit();
                    continue;
                }
                debug!("book finished");
                self.chap_idx = 0;
                self.sent_idx = 0;
                self.set_state(PlaybackState::Stopped);
                self.persist().await;
                return;
            }

            let id = UtteranceId(self.next_utterance);
            self.next_utterance += 1;
            self.in_flight = Some(id);
            let utterance = Utterance {
                id,
                text: sentences[self.sent_idx].clone(),
                voice: self.voice.clone(),
            };
            if let Err(e) = self.speaker.speak(utterance).await {
                warn!(
                    chapter = chap_idx,
                    sentence = self.sent_idx,
                    error = %e,
                    "utterance rejected; skipping sentence"
                );
                self.in_flight = None;
                self.sent_idx += 1;
                continue;
            }

            if self.sent_idx == 0 && has_next {
                let next = self.chapter_loader(chap_idx + 1);
                self.cache.prefetch(chap_idx + 1, next);
            }
            return;
        }
    }

    /// A detached future loading one chapter's sentences from the blob store.
    fn chapter_loader(
        &self,
        chap_idx: usize,
    ) -> impl Future<Output = Result<Vec<String>>> + Send + use<> {
        let blobs = Arc::clone(&self.blobs);
        let book_id = self.book_id;
        let href = self
            .chapters
            .get(chap_idx)
            .map(|c| c.href.clone())
            .unwrap_or_default();
        async move {
            let book_id = book_id.ok_or_else(|| Error::chapter_load(&href, "no book open"))?;
            load_chapter_sentences(blobs.as_ref(), book_id, &href).await
        }
    }

    async fn cancel_speech(&mut self) {
        self.in_flight = None;
        self.speaker.cancel().await;
    }

    async fn persist(&self) {
        if let Err(e) = self.save_position().await {
            error!(
                book_id = ?self.book_id,
                chapter = self.chap_idx,
                sentence = self.sent_idx,
                error = %e,
                "failed to persist position"
            );
        }
    }

    fn clamp_chapter(&self, chap_idx: usize) -> usize {
        chap_idx.min(self.chapters.len().saturating_sub(1))
    }

    fn chapter_title(&self) -> String {
        self.chapters
            .get(self.chap_idx)
            .map(|c| c.title.clone())
            .unwrap_or_default()
    }

    fn current_sentence(&self) -> String {
        self.cache
            .sentence(self.chap_idx, self.sent_idx)
            .unwrap_or_default()
            .to_string()
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "state change");
        }
        self.state = state;
        self.emit();
    }

    fn emit(&self) {
        let Some(updates) = &self.updates else {
            return;
        };
        let update = PlaybackUpdate {
            state: self.state,
            chap_idx: self.chap_idx,
            sent_idx: self.sent_idx,
            total_chapters: self.chapters.len(),
            chapter_title: self.chapter_title(),
            current_sentence: self.current_sentence(),
        };
        // A dropped receiver just means nobody is listening.
        let _ = updates.send(update);
    }
}
