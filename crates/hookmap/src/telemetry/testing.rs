// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Capture of cache events for assertions in unit tests.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// Collects the formatted events a cache emits on the current thread.
///
/// [`EventCapture::install`] routes events here until the returned guard is dropped, so a test
/// can assert on activity names such as `cache.stored` or on the search miss warning.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventCapture {
    events: Arc<Mutex<Vec<u8>>>,
}

impl EventCapture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes this capture the thread's default subscriber while the guard lives.
    #[must_use]
    pub fn install(&self) -> DefaultGuard {
        use tracing_subscriber::layer::SubscriberExt;

        let layer = tracing_subscriber::fmt::layer().with_writer(self.clone()).with_ansi(false);
        tracing::subscriber::set_default(tracing_subscriber::registry().with(layer))
    }

    /// Everything written so far, one formatted event per line.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.events.lock()).into_owned()
    }

    #[track_caller]
    pub fn assert_logged(&self, needle: &str) {
        let text = self.text();
        assert!(text.contains(needle), "expected `{needle}` among cache events:\n{text}");
    }

    #[track_caller]
    pub fn assert_not_logged(&self, needle: &str) {
        let text = self.text();
        assert!(!text.contains(needle), "did not expect `{needle}` among cache events:\n{text}");
    }
}

impl<'a> MakeWriter<'a> for EventCapture {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for EventCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.events.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
