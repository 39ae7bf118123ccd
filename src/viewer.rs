//! Example/audio viewer modal.
//!
//! State machine: Closed -> Loading -> {Populated | LoadFailed} ->
//! Closed. Reopening while open is idempotent (back to Loading, content
//! replaced). At most one audio clip plays at a time; starting a second
//! clip stops the first, and closing the modal stops whatever plays.

use anyhow::Result;
use tracing::warn;

use crate::audio::AudioBackend;
use crate::protocol::Example;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerPhase {
    Closed,
    Loading,
    Populated,
    LoadFailed,
}

pub struct ExampleViewer<B: AudioBackend> {
    phase: ViewerPhase,
    model: Option<String>,
    examples: Vec<Example>,
    error: Option<String>,
    selected: usize,
    playing: Option<usize>,
    backend: B,
}

impl<B: AudioBackend> ExampleViewer<B> {
    pub fn new(backend: B) -> Self {
        ExampleViewer {
            phase: ViewerPhase::Closed,
            model: None,
            examples: Vec::new(),
            error: None,
            selected: 0,
            playing: None,
            backend,
        }
    }

    pub fn phase(&self) -> ViewerPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase != ViewerPhase::Closed
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn playing(&self) -> Option<usize> {
        self.playing
    }

    /// Opens (or reopens) the modal for a model. Content from any
    /// previous model is dropped and audio stops immediately.
    pub fn open(&mut self, model: &str) {
        self.stop_playback();
        self.phase = ViewerPhase::Loading;
        self.model = Some(model.to_string());
        self.examples.clear();
        self.error = None;
        self.selected = 0;
    }

    /// Applies a finished examples fetch. A late response for a model
    /// the user has since navigated away from is ignored.
    pub fn loaded(&mut self, model: &str, examples: Vec<Example>) {
        if !self.expects(model) {
            return;
        }
        self.examples = examples;
        self.phase = ViewerPhase::Populated;
    }

    pub fn load_failed(&mut self, model: &str, error: String) {
        if !self.expects(model) {
            return;
        }
        self.error = Some(error);
        self.phase = ViewerPhase::LoadFailed;
    }

    fn expects(&self, model: &str) -> bool {
        self.phase == ViewerPhase::Loading && self.model.as_deref() == Some(model)
    }

    pub fn select_next(&mut self) {
        if !self.examples.is_empty() {
            self.selected = (self.selected + 1).min(self.examples.len() - 1);
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Starts playback of one example's fetched audio. Whatever was
    /// playing is stopped and rewound first, so at most one clip is
    /// ever audible.
    pub fn start_playback(&mut self, index: usize, bytes: Vec<u8>) -> Result<()> {
        self.stop_playback();
        if !self.is_open() || index >= self.examples.len() {
            // Audio arrived after the modal closed or content changed.
            return Ok(());
        }
        self.backend.start(bytes)?;
        self.playing = Some(index);
        Ok(())
    }

    /// Explicit pause: stop, rewind, clear the playing marker.
    pub fn stop_playback(&mut self) {
        self.backend.stop();
        self.playing = None;
    }

    /// Clears the playing marker once a clip drains on its own.
    pub fn tick(&mut self) -> bool {
        if self.playing.is_some() && self.backend.is_finished() {
            self.playing = None;
            return true;
        }
        false
    }

    /// Closing always stops audio; nothing may keep playing behind a
    /// closed modal.
    pub fn close(&mut self) {
        self.stop_playback();
        self.phase = ViewerPhase::Closed;
        self.model = None;
        self.examples.clear();
        self.error = None;
        self.selected = 0;
    }

    /// Best-effort playback used by the app loop: a device failure is
    /// logged, never fatal.
    pub fn try_start_playback(&mut self, index: usize, bytes: Vec<u8>) {
        if let Err(e) = self.start_playback(index, bytes) {
            warn!("audio playback failed: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records backend calls; "playing" means started and not stopped
    /// or drained.
    #[derive(Default)]
    struct FakeBackend {
        active: bool,
        starts: usize,
        stops: usize,
        drained: bool,
    }

    impl AudioBackend for FakeBackend {
        fn start(&mut self, _bytes: Vec<u8>) -> Result<()> {
            assert!(!self.active, "second clip started while one was playing");
            self.active = true;
            self.starts += 1;
            self.drained = false;
            Ok(())
        }

        fn stop(&mut self) {
            self.active = false;
            self.stops += 1;
        }

        fn is_finished(&self) -> bool {
            !self.active || self.drained
        }
    }

    fn viewer_with_examples(count: usize) -> ExampleViewer<FakeBackend> {
        let mut viewer = ExampleViewer::new(FakeBackend::default());
        viewer.open("whisper-base");
        let examples = (0..count)
            .map(|i| Example {
                reference: format!("ref {i}"),
                hypothesis: format!("hyp {i}"),
                wer: i as f64,
                id: Some(format!("sample-{i}")),
            })
            .collect();
        viewer.loaded("whisper-base", examples);
        viewer
    }

    #[test]
    fn lifecycle_closed_loading_populated() {
        let mut viewer = ExampleViewer::new(FakeBackend::default());
        assert_eq!(viewer.phase(), ViewerPhase::Closed);
        viewer.open("m");
        assert_eq!(viewer.phase(), ViewerPhase::Loading);
        viewer.loaded("m", vec![Example::default()]);
        assert_eq!(viewer.phase(), ViewerPhase::Populated);
        viewer.close();
        assert_eq!(viewer.phase(), ViewerPhase::Closed);
        assert!(viewer.examples().is_empty());
    }

    #[test]
    fn reopening_resets_to_loading_and_replaces_content() {
        let mut viewer = viewer_with_examples(3);
        viewer.open("whisper-large");
        assert_eq!(viewer.phase(), ViewerPhase::Loading);
        assert!(viewer.examples().is_empty());
        assert_eq!(viewer.model(), Some("whisper-large"));
    }

    #[test]
    fn stale_fetch_for_other_model_is_ignored() {
        let mut viewer = ExampleViewer::new(FakeBackend::default());
        viewer.open("a");
        viewer.open("b");
        viewer.loaded("a", vec![Example::default()]);
        assert_eq!(viewer.phase(), ViewerPhase::Loading);
        viewer.load_failed("a", "late error".to_string());
        assert_eq!(viewer.phase(), ViewerPhase::Loading);
        viewer.loaded("b", vec![Example::default()]);
        assert_eq!(viewer.phase(), ViewerPhase::Populated);
    }

    #[test]
    fn starting_second_clip_stops_the_first() {
        let mut viewer = viewer_with_examples(3);
        viewer.start_playback(0, vec![1]).unwrap();
        assert_eq!(viewer.playing(), Some(0));

        // FakeBackend::start asserts nothing else is active, so this
        // passing proves stop-before-play.
        viewer.start_playback(1, vec![2]).unwrap();
        assert_eq!(viewer.playing(), Some(1));
        assert_eq!(viewer.backend.starts, 2);
    }

    #[test]
    fn rapid_toggles_keep_at_most_one_active() {
        let mut viewer = viewer_with_examples(5);
        for i in 0..5 {
            viewer.start_playback(i, vec![i as u8]).unwrap();
            assert!(viewer.backend.active);
            assert_eq!(viewer.playing(), Some(i));
        }
        viewer.stop_playback();
        assert!(!viewer.backend.active);
        assert_eq!(viewer.playing(), None);
    }

    #[test]
    fn natural_end_clears_playing_marker() {
        let mut viewer = viewer_with_examples(1);
        viewer.start_playback(0, vec![1]).unwrap();
        assert!(!viewer.tick());

        viewer.backend.drained = true;
        assert!(viewer.tick());
        assert_eq!(viewer.playing(), None);
    }

    #[test]
    fn closing_modal_stops_audio() {
        let mut viewer = viewer_with_examples(2);
        viewer.start_playback(0, vec![1]).unwrap();
        viewer.close();
        assert!(!viewer.backend.active);
        assert_eq!(viewer.playing(), None);
    }

    #[test]
    fn audio_arriving_after_close_is_dropped() {
        let mut viewer = viewer_with_examples(2);
        viewer.close();
        viewer.start_playback(0, vec![1]).unwrap();
        assert_eq!(viewer.playing(), None);
        assert_eq!(viewer.backend.starts, 0);
    }
}
