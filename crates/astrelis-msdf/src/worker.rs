//! Background atlas regeneration.
//!
//! A render loop can hand a new configuration to an [`AtlasWorker`], keep
//! drawing with the old atlas and poll [`AtlasWorker::is_finished`] once per
//! frame. Generation is never interrupted; a worker that is dropped before
//! it finishes runs to completion on its own and its result is discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::atlas::{AtlasConfig, AtlasResult, generate_atlas};
use crate::error::{MsdfError, MsdfResult};
use crate::font::Font;

/// Sets the completion flag when the generation closure exits, panics included.
struct CompletionFlag(Arc<AtomicBool>);

impl Drop for CompletionFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Atlas generation running on its own thread.
pub struct AtlasWorker {
    handle: thread::JoinHandle<MsdfResult<AtlasResult>>,
    finished: Arc<AtomicBool>,
}

impl AtlasWorker {
    /// Start generating an atlas for `chars` on a thread named `msdf-atlas`.
    pub fn spawn(
        font: Arc<Font>,
        chars: impl Into<String>,
        config: AtlasConfig,
    ) -> std::io::Result<Self> {
        let chars = chars.into();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = CompletionFlag(finished.clone());

        let handle = thread::Builder::new()
            .name("msdf-atlas".to_string())
            .spawn(move || {
                let _flag = flag;
                tracing::debug!(glyphs = chars.chars().count(), "Atlas worker started");
                generate_atlas(&font, &chars, &config)
            })?;

        Ok(Self { handle, finished })
    }

    /// Whether generation has ended. Cheap enough to call every frame.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// The result if generation has ended, otherwise the worker back.
    pub fn try_take(self) -> Result<MsdfResult<AtlasResult>, Self> {
        if self.is_finished() {
            Ok(self.join())
        } else {
            Err(self)
        }
    }

    /// Block until generation ends.
    pub fn wait(self) -> MsdfResult<AtlasResult> {
        self.join()
    }

    fn join(self) -> MsdfResult<AtlasResult> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("Atlas worker thread panicked");
                Err(MsdfError::WorkerPanicked)
            }
        }
    }
}

impl std::fmt::Debug for AtlasWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasWorker")
            .field("finished", &self.is_finished())
            .finish()
    }
}
