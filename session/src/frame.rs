use std::cell::RefCell;

/// Defers work until after the native layer has repainted.
///
/// The runtime signals "rendered" before new pixels are on screen; notifying
/// the destination at that instant would let it screenshot stale content.
/// Implementations must never run a callback synchronously from
/// `post_after_repaint`.
pub trait FrameScheduler {
    fn post_after_repaint(&self, callback: Box<dyn FnOnce()>);
}

type FrameCallback = Box<dyn FnOnce()>;

/// Frame-count scheduler driven by the host's render loop.
///
/// The host calls `pump` once per composited frame; callbacks run after two
/// pumps, the equivalent of "wait until the next composited frame, twice".
pub struct FrameQueue {
    pending: RefCell<Vec<(u8, FrameCallback)>>,
}

impl FrameQueue {
    const FRAME_DELAY: u8 = 2;

    pub fn new() -> Self {
        Self {
            pending: RefCell::new(Vec::new()),
        }
    }

    /// Advances one frame, running callbacks that have waited long enough.
    /// Callbacks may schedule more work; that work waits for later pumps.
    pub fn pump(&self) {
        let due: Vec<FrameCallback> = {
            let mut pending = self.pending.borrow_mut();
            for entry in pending.iter_mut() {
                entry.0 -= 1;
            }
            let mut due = Vec::new();
            let mut index = 0;
            while index < pending.len() {
                if pending[index].0 == 0 {
                    due.push(pending.remove(index).1);
                } else {
                    index += 1;
                }
            }
            due
        };
        for callback in due {
            callback();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler for FrameQueue {
    fn post_after_repaint(&self, callback: Box<dyn FnOnce()>) {
        self.pending.borrow_mut().push((Self::FRAME_DELAY, callback));
    }
}
