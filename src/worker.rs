//! Background frame rendering
//!
//! The worker renders frames on its own thread and publishes each finished
//! frame by swapping an `Arc` under one mutex. Readers clone the `Arc` and
//! never hold the lock while looking at pixels.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::bitmap::PixelBuffer;
use crate::effects::Effect;
use crate::error::{Error, Result};

/// Ping-pong mix fraction: 0 -> 1 -> 0 over `period_frames`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixClock {
    period_frames: u32,
}

impl MixClock {
    pub fn new(period_frames: u32) -> Self {
        Self { period_frames: period_frames.max(1) }
    }

    pub fn period_frames(&self) -> u32 {
        self.period_frames
    }

    pub fn mix_at(&self, frame: u64) -> f32 {
        let period = self.period_frames as u64;
        let t = (frame % period) as f32 / period as f32;
        if t < 0.5 {
            t * 2.0
        } else {
            2.0 - t * 2.0
        }
    }
}

type FrontBuffer = Arc<Mutex<Option<Arc<PixelBuffer>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // a panicking renderer never leaves the slot half-written
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Frame Worker
// ============================================================================

/// Renders frames of an effect on a background thread
pub struct FrameWorker {
    front: FrontBuffer,
    stop: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
    ready: Receiver<u64>,
    handle: Option<JoinHandle<Result<u64>>>,
}

impl FrameWorker {
    /// Start rendering `effect` with the mix driven by `clock`
    pub fn spawn<E>(effect: E, clock: MixClock) -> Result<Self>
    where
        E: Effect + Send + 'static,
    {
        let front: FrontBuffer = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));
        let frames = Arc::new(AtomicU64::new(0));
        // one pending notification is enough, readers only want the newest
        let (sender, ready) = mpsc::sync_channel(1);

        let handle = {
            let front = Arc::clone(&front);
            let stop = Arc::clone(&stop);
            let frames = Arc::clone(&frames);
            thread::Builder::new()
                .name("fastblur-worker".into())
                .spawn(move || Self::render_loop(effect, clock, &front, &stop, &frames, &sender))?
        };

        Ok(Self {
            front,
            stop,
            frames,
            ready,
            handle: Some(handle),
        })
    }

    fn render_loop<E: Effect>(
        mut effect: E,
        clock: MixClock,
        front: &Mutex<Option<Arc<PixelBuffer>>>,
        stop: &AtomicBool,
        frames: &AtomicU64,
        sender: &SyncSender<u64>,
    ) -> Result<u64> {
        log::debug!("worker started: {}", effect.name());
        let mut count = 0u64;

        while !stop.load(Ordering::Acquire) {
            let frame = match effect.render(clock.mix_at(count)) {
                Ok(frame) => frame,
                Err(e) => {
                    log::error!("worker stopped after {} frames: {}", count, e);
                    return Err(e);
                },
            };
            *lock(front) = Some(Arc::new(frame));
            count += 1;
            frames.store(count, Ordering::Release);

            match sender.try_send(count) {
                Ok(()) | Err(TrySendError::Full(_)) => {},
                Err(TrySendError::Disconnected(_)) => break,
            }
        }

        log::debug!("worker stopped after {} frames", count);
        Ok(count)
    }

    /// Most recently finished frame, if any
    pub fn latest(&self) -> Option<Arc<PixelBuffer>> {
        lock(&self.front).clone()
    }

    /// Number of frames finished so far
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Block until a new frame is published, returning its sequence number
    pub fn wait_frame(&self, timeout: Duration) -> Option<u64> {
        let mut newest = self.ready.recv_timeout(timeout).ok()?;
        loop {
            match self.ready.try_recv() {
                Ok(n) => newest = n,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return Some(newest),
            }
        }
    }

    /// Ask the worker to finish after the current frame
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the worker and wait for it; returns the frames rendered
    pub fn join(mut self) -> Result<u64> {
        self.stop();
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| Error::WorkerPanicked)?,
            None => Ok(self.frames()),
        }
    }
}

impl Drop for FrameWorker {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
