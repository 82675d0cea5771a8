//! Eyetracker marker channel.
//!
//! Messages are fire-and-forget: the scorer never waits for an
//! acknowledgement and a failed send is logged, not propagated.

use std::io::Write;

use tracing::info;

use crate::error::MarkerError;

pub trait MarkerSink: Send {
    fn send(&mut self, message: &str) -> Result<(), MarkerError>;
}

/// Emits markers as tracing events under the `eyetracker` target, for
/// sessions run without tracker hardware.
#[derive(Debug, Default)]
pub struct TracingMarker;

impl MarkerSink for TracingMarker {
    fn send(&mut self, message: &str) -> Result<(), MarkerError> {
        info!(target: "eyetracker", "{message}");
        Ok(())
    }
}

/// Writes one marker per line to any writer (a socket, a pipe, a file).
pub struct WriterMarker<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> WriterMarker<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> MarkerSink for WriterMarker<W> {
    fn send(&mut self, message: &str) -> Result<(), MarkerError> {
        writeln!(self.writer, "{message}")?;
        Ok(())
    }
}
