//! Frame sources and the sink they deliver frames into.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use tracing::{debug, warn};

use crate::config::OverrunPolicy;
use crate::error::SourceError;
use crate::frame::Frame;

/// Anything that produces timestamped frames: a camera, a video file, a
/// replayed recording.
///
/// `start` hands the source a [`FrameSink`]; the source pushes frames from
/// its own thread until `stop` is called or the sink reports closed.
///
/// # Example
///
/// ```ignore
/// use roitrack_rs::{FrameSink, FrameSource, SourceError};
///
/// struct Camera { /* device handle */ }
///
/// impl FrameSource for Camera {
///     fn start(&mut self, sink: FrameSink) -> Result<(), SourceError> {
///         // open the device, spawn a capture thread calling sink.push(frame)
///         Ok(())
///     }
///
///     fn stop(&mut self) {
///         // signal the capture thread and join it
///     }
/// }
/// ```
pub trait FrameSource: Send {
    fn start(&mut self, sink: FrameSink) -> Result<(), SourceError>;

    /// Stop delivering frames. Must be safe to call when not started.
    fn stop(&mut self);

    fn name(&self) -> &str {
        "frame source"
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn start(&mut self, sink: FrameSink) -> Result<(), SourceError> {
        (**self).start(sink)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[derive(Debug, Default)]
struct SinkState {
    closed: AtomicBool,
    dropped: AtomicU64,
}

/// Handle a source pushes frames into.
///
/// Cloning is cheap; every clone feeds the same processing loop. Once the
/// pipeline stops, the sink is closed and further pushes are rejected.
#[derive(Debug, Clone)]
pub struct FrameSink {
    frames: Sender<Frame>,
    /// Set under [`OverrunPolicy::DropStale`] so a push can evict the
    /// pending frame.
    stale: Option<Receiver<Frame>>,
    failures: Sender<SourceError>,
    state: Arc<SinkState>,
}

impl FrameSink {
    /// Create a sink plus the receiving ends for the processing loop.
    pub(crate) fn channel(policy: OverrunPolicy) -> (Self, Receiver<Frame>, Receiver<SourceError>) {
        let (frames, frame_rx, stale) = match policy {
            OverrunPolicy::DropStale => {
                let (tx, rx) = crossbeam_channel::bounded(1);
                (tx, rx.clone(), Some(rx))
            }
            OverrunPolicy::Queue { depth } => {
                let (tx, rx) = crossbeam_channel::bounded(depth.max(1));
                (tx, rx, None)
            }
        };
        let (failures, failure_rx) = crossbeam_channel::unbounded();
        let sink = Self {
            frames,
            stale,
            failures,
            state: Arc::default(),
        };
        (sink, frame_rx, failure_rx)
    }

    /// Deliver a frame. Returns `false` once the sink is closed, which tells
    /// the source to stop producing.
    ///
    /// With [`OverrunPolicy::DropStale`] this never blocks: a frame still
    /// waiting to be processed is replaced. With [`OverrunPolicy::Queue`] it
    /// blocks while the queue is full.
    pub fn push(&self, frame: Frame) -> bool {
        if self.is_closed() {
            return false;
        }
        let Some(stale) = &self.stale else {
            return self.frames.send(frame).is_ok();
        };

        let mut frame = frame;
        loop {
            match self.frames.try_send(frame) {
                Ok(()) => return true,
                Err(TrySendError::Full(rejected)) => {
                    frame = rejected;
                    match stale.try_recv() {
                        Ok(old) => {
                            self.state.dropped.fetch_add(1, Ordering::Relaxed);
                            debug!(timestamp = old.timestamp, "stale frame dropped");
                        }
                        Err(TryRecvError::Empty) => {}
                        Err(TryRecvError::Disconnected) => return false,
                    }
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
    }

    /// Report that the source cannot continue. The pipeline stops and
    /// subscribers are told once.
    pub fn fail(&self, error: SourceError) {
        if self.is_closed() {
            return;
        }
        warn!(%error, "frame source failed");
        let _ = self.failures.send(error);
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// Frames replaced before they could be processed.
    pub fn dropped_frames(&self) -> u64 {
        self.state.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn close(&self) {
        self.state.closed.store(true, Ordering::Release);
    }
}

/// Replays a fixed list of frames, e.g. a decoded recording or test fixture.
#[derive(Debug, Default)]
pub struct FrameSequence {
    frames: Arc<[Frame]>,
    interval: Option<Duration>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl FrameSequence {
    pub fn new(frames: impl Into<Arc<[Frame]>>) -> Self {
        Self {
            frames: frames.into(),
            interval: None,
            running: Arc::default(),
            worker: None,
        }
    }

    /// Pause between frames, to mimic a live source.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for FrameSequence {
    fn start(&mut self, sink: FrameSink) -> Result<(), SourceError> {
        self.stop();
        self.running.store(true, Ordering::Release);

        let frames = Arc::clone(&self.frames);
        let running = Arc::clone(&self.running);
        let interval = self.interval;
        let handle = thread::Builder::new()
            .name("frame-sequence".into())
            .spawn(move || {
                for frame in frames.iter() {
                    if !running.load(Ordering::Acquire) || !sink.push(frame.clone()) {
                        break;
                    }
                    if let Some(interval) = interval {
                        thread::sleep(interval);
                    }
                }
                debug!(frames = frames.len(), "frame sequence finished");
            })
            .map_err(|e| SourceError::new(format!("cannot spawn replay thread: {e}")))?;

        self.worker = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }

    fn name(&self) -> &str {
        "frame sequence"
    }
}

impl Drop for FrameSequence {
    fn drop(&mut self) {
        self.stop();
    }
}
