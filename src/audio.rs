//! Audio playback backend.
//!
//! The viewer speaks to this trait so the single-playback discipline is
//! testable without a sound device; the rodio implementation is the
//! only code that touches the output stream.

use std::io::Cursor;

use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};

pub trait AudioBackend {
    /// Starts playback of an encoded audio clip, replacing anything
    /// currently playing.
    fn start(&mut self, bytes: Vec<u8>) -> Result<()>;
    /// Stops and rewinds; a later `start` begins from zero.
    fn stop(&mut self);
    /// True once the clip has drained (or nothing was ever started).
    fn is_finished(&self) -> bool;
}

/// Plays clips on the default output device. The stream is opened
/// lazily on first playback so a headless session never touches the
/// audio stack.
#[derive(Default)]
pub struct RodioBackend {
    stream: Option<OutputStream>,
    sink: Option<Sink>,
}

impl RodioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn stream(&mut self) -> Result<&OutputStream> {
        if self.stream.is_none() {
            let stream = OutputStreamBuilder::from_default_device()
                .context("no default audio output device")?
                .open_stream()
                .context("failed to open audio output stream")?;
            self.stream = Some(stream);
        }
        Ok(self.stream.as_ref().expect("stream just set"))
    }
}

impl AudioBackend for RodioBackend {
    fn start(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.stop();
        let source = Decoder::new(Cursor::new(bytes)).context("undecodable audio sample")?;
        let stream = self.stream()?;
        let sink = Sink::connect_new(stream.mixer());
        sink.append(source);
        self.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn is_finished(&self) -> bool {
        self.sink.as_ref().map(Sink::empty).unwrap_or(true)
    }
}
