//! Two-context crop editor.
//!
//! [`CropEditor`] lives on the render context and owns the transform engine
//! and the renderer. [`CropHandle`] is the control side: any thread may clone
//! it and issue gestures, which travel as queued commands and take effect at
//! the start of the next frame. Queries through the handle read a snapshot
//! published after each frame, so they always describe what is on screen.

mod command;
mod crop_editor;
mod handle;
mod pending;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::queue::CommandQueue;
use crate::transform::{CropCorners, CropState};

use command::EditCommand;

pub use crop_editor::CropEditor;
pub use handle::CropHandle;
pub use pending::Pending;

/// Engine state as of the last drawn frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CropSnapshot {
    pub state: CropState,
    pub corners: CropCorners,
    /// Output size the frame was drawn at.
    pub output: (u32, u32),
    pub has_image: bool,
    /// Frames drawn so far, including this one. `0` before the first frame.
    pub frame: u64,
}

/// State shared between the editor and every handle.
pub(crate) struct Shared {
    commands: CommandQueue<EditCommand>,
    render_thread: OnceLock<ThreadId>,
    frames: AtomicU64,
    redraw_tx: Sender<()>,
    redraw_rx: Receiver<()>,
    snapshot: Mutex<CropSnapshot>,
    capture_timeout: Duration,
}

impl Shared {
    fn new(snapshot: CropSnapshot, capture_timeout: Duration) -> Self {
        // One slot: repeated requests before the next frame collapse into one.
        let (redraw_tx, redraw_rx) = crossbeam_channel::bounded(1);
        Self {
            commands: CommandQueue::new(),
            render_thread: OnceLock::new(),
            frames: AtomicU64::new(0),
            redraw_tx,
            redraw_rx,
            snapshot: Mutex::new(snapshot),
            capture_timeout,
        }
    }

    pub(crate) fn is_render_thread(&self) -> bool {
        self.render_thread.get() == Some(&thread::current().id())
    }

    fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    fn request_render(&self) {
        let _ = self.redraw_tx.try_send(());
    }

    fn snapshot(&self) -> CropSnapshot {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: CropSnapshot) {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
        self.frames.store(snapshot.frame, Ordering::Release);
    }
}

