//! Frame processing loop and the thread-safe pipeline around it.

use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, select};
use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

use crate::chart::{ChartRange, RangeAggregator, SeriesPair, SeriesVisibility, write_table};
use crate::config::{MissedUpdatePolicy, PipelineConfig, validate_time_divisor};
use crate::error::{
    ConfigError, ExportError, FrameError, PipelineError, SourceError, TrackerError,
};
use crate::frame::{Frame, LumaFrame};
use crate::tracker::{
    AlgorithmKind, InitPolicy, Rect, Registry, Removed, TrackedObject, TrackerAlgorithm,
};

use super::clock::PipelineClock;
use super::draft::RoiDraft;
use super::overlay::{FpsCounter, Overlay, OverlayRoi};
use super::source::{FrameSink, FrameSource};

/// One sample appended during a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSample {
    pub index: usize,
    pub id: u64,
    pub time: f64,
    pub x: f64,
    pub y: f64,
    /// The tracker failed this frame and the last known ROI was sampled
    pub held: bool,
}

/// Result of processing one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub timestamp: u64,
    pub elapsed: f64,
    pub samples: Vec<FrameSample>,
    /// Indices whose tracker reported an error this frame
    pub failed: Vec<usize>,
    pub overlay: Overlay,
    /// Global chart range after this frame, if one has been established
    pub range: Option<ChartRange>,
}

/// Notifications delivered to [`TrackingPipeline::subscribe`] receivers.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    FrameProcessed(FrameReport),
    ChartUpdated(ChartRange),
    SourceFailed(String),
    /// Frame processing panicked outside any tracker; the pipeline stopped.
    WorkerFailed(String),
    Stopped,
}

/// Run one tracker step. A panic inside the algorithm becomes an error for
/// that object alone.
fn advance_isolated(
    object: &mut TrackedObject,
    frame: &LumaFrame,
    policy: InitPolicy,
) -> Result<Rect, TrackerError> {
    panic::catch_unwind(AssertUnwindSafe(|| object.advance(frame, policy)))
        .unwrap_or_else(|payload| Err(TrackerError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// All mutable tracking state: registry, clock, charts and settings.
///
/// A `Session` is single-threaded; [`TrackingPipeline`] wraps it in a mutex
/// so frame processing and operator actions never interleave.
#[derive(Debug)]
pub struct Session {
    registry: Registry,
    clock: PipelineClock,
    fps: FpsCounter,
    draft: RoiDraft,
    ranges: RangeAggregator,
    frame_size: Option<(u32, u32)>,
    config: PipelineConfig,
}

impl Session {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            registry: Registry::new(),
            clock: PipelineClock::default(),
            fps: FpsCounter::default(),
            draft: RoiDraft::new(),
            ranges: RangeAggregator::new(config.visibility),
            frame_size: None,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn clock(&self) -> &PipelineClock {
        &self.clock
    }

    /// Track `roi` with the configured algorithm. Returns the new index.
    pub fn create_roi(&mut self, roi: Rect) -> usize {
        let tracker = self.config.algorithm.build();
        self.create_roi_with(roi, tracker)
    }

    /// Track `roi` with a caller-supplied algorithm instance.
    ///
    /// The time origin is reset so the next frame starts a fresh time axis.
    pub fn create_roi_with(&mut self, roi: Rect, tracker: Box<dyn TrackerAlgorithm>) -> usize {
        self.clock.reset();
        self.registry.insert(roi, tracker)
    }

    /// Remove the first ROI containing `(x, y)` and reset the time origin.
    pub fn remove_at(&mut self, x: f64, y: f64) -> Option<Removed> {
        let removed = self.registry.remove_at(x, y)?;
        self.clock.reset();
        Some(removed)
    }

    pub fn remove_all(&mut self) {
        self.registry.clear();
        self.clock.reset();
    }

    /// Drop every ROI and chart range and forget the frame size.
    pub fn new_take(&mut self) {
        self.remove_all();
        self.ranges.reset();
        self.fps.reset();
        self.draft.cancel();
        self.frame_size = None;
    }

    pub fn begin_draft(&mut self, x: f64, y: f64) {
        self.draft.begin(x, y);
    }

    pub fn drag_draft(&mut self, x: f64, y: f64) {
        self.draft.drag_to(x, y);
    }

    /// Finish the drag at `(x, y)` and create a ROI from it, unless the
    /// drawn rectangle has no area.
    pub fn finish_draft(&mut self, x: f64, y: f64) -> Option<usize> {
        let roi = self.draft.finish(x, y)?;
        Some(self.create_roi(roi))
    }

    pub fn cancel_draft(&mut self) {
        self.draft.cancel();
    }

    /// Algorithm used for ROIs created from now on.
    pub fn set_algorithm(&mut self, algorithm: AlgorithmKind) {
        self.config.algorithm = algorithm;
    }

    pub fn set_capacity(&mut self, capacity: usize) -> Result<(), ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.config.capacity = capacity;
        Ok(())
    }

    pub fn set_time_divisor(&mut self, divisor: f64) -> Result<(), ConfigError> {
        validate_time_divisor(divisor)?;
        self.config.time_divisor = divisor;
        Ok(())
    }

    pub fn set_flip_vertical(&mut self, flip: bool) {
        self.config.flip_vertical = flip;
    }

    pub fn set_init_policy(&mut self, policy: InitPolicy) {
        self.config.init_policy = policy;
    }

    pub fn set_missed_update(&mut self, policy: MissedUpdatePolicy) {
        self.config.missed_update = policy;
    }

    /// Change which value series feed the y range, recomputing it at once.
    pub fn set_visibility(&mut self, visibility: SeriesVisibility) -> Option<ChartRange> {
        self.config.visibility = visibility;
        self.ranges.set_visibility(visibility);
        self.ranges.update(self.registry.iter().map(|o| &o.series))
    }

    pub fn chart_range(&self) -> Option<ChartRange> {
        self.ranges.global()
    }

    pub fn chart_view(&self) -> Option<ChartRange> {
        self.ranges.view()
    }

    pub fn zoom(&mut self, range: ChartRange) -> bool {
        self.ranges.zoom(range)
    }

    pub fn reset_zoom(&mut self) {
        self.ranges.reset_zoom();
    }

    /// Copy of every object's series, in index order.
    pub fn series(&self) -> Vec<SeriesPair> {
        self.registry.iter().map(|o| o.series.clone()).collect()
    }

    /// Write the combined table for all objects. Returns the row count.
    pub fn export_table<W: Write>(&self, writer: W) -> Result<usize, ExportError> {
        write_table(
            self.registry.iter().map(|o| &o.series),
            &self.config.export,
            writer,
        )
    }

    /// Run every tracker on `frame` and append one sample per object.
    ///
    /// An object whose tracker fails keeps its previous ROI; under
    /// [`MissedUpdatePolicy::HoldLast`] that ROI is sampled again, under
    /// [`MissedUpdatePolicy::Skip`] the object gets no sample this frame.
    ///
    /// An invalid frame is rejected before any state changes. Once an object
    /// is initialized, frames of a different size are rejected too.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameReport, FrameError> {
        frame.validate()?;
        let size = (frame.width, frame.height);
        if let Some(expected) = self.frame_size
            && expected != size
            && self.registry.has_initialized()
        {
            return Err(FrameError::DimensionMismatch {
                expected,
                got: size,
            });
        }
        self.frame_size = Some(size);

        let divisor = self.config.time_divisor;
        let initial = self.clock.observe(frame.timestamp);
        let elapsed = super::clock::elapsed(frame.timestamp, initial, divisor);
        self.fps.observe(frame.timestamp, divisor);

        let mut samples = Vec::with_capacity(self.registry.len());
        let mut failed = Vec::new();
        if !self.registry.is_empty() {
            let luma = frame.luma();
            let height = f64::from(frame.height);
            for (index, object) in self.registry.iter_mut().enumerate() {
                let held = match advance_isolated(object, &luma, self.config.init_policy) {
                    Ok(_) => false,
                    Err(e) => {
                        warn!(index, id = object.id, error = %e, "tracker step failed");
                        failed.push(index);
                        // an object still waiting to initialize has no position to hold
                        if !object.initialized
                            || self.config.missed_update == MissedUpdatePolicy::Skip
                        {
                            continue;
                        }
                        true
                    }
                };
                let (x, cy) = object.roi.center();
                let y = if self.config.flip_vertical {
                    height - cy
                } else {
                    cy
                };
                object.series.push(elapsed, x, y, self.config.capacity);
                samples.push(FrameSample {
                    index,
                    id: object.id,
                    time: elapsed,
                    x,
                    y,
                    held,
                });
            }
        }

        let range = self.ranges.update(self.registry.iter().map(|o| &o.series));
        trace!(
            timestamp = frame.timestamp,
            elapsed,
            samples = samples.len(),
            "frame processed"
        );

        Ok(FrameReport {
            timestamp: frame.timestamp,
            elapsed,
            samples,
            failed,
            overlay: self.overlay(elapsed),
            range,
        })
    }

    fn overlay(&self, elapsed: f64) -> Overlay {
        let settings = self.config.overlay;
        Overlay {
            rois: self
                .registry
                .iter()
                .enumerate()
                .map(|(index, o)| OverlayRoi {
                    index,
                    id: o.id,
                    rect: o.roi,
                })
                .collect(),
            draft: self.draft.preview(),
            fps: settings
                .show_fps
                .then(|| self.fps.fps().map(|fps| format!("{fps:.1} fps")))
                .flatten(),
            timestamp: settings.show_timestamp.then(|| format!("{elapsed:.3} s")),
        }
    }
}

struct Shared {
    session: Mutex<Session>,
    subscribers: Mutex<Vec<Sender<PipelineEvent>>>,
    running: AtomicBool,
}

impl Shared {
    fn emit(&self, event: PipelineEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn process(&self, frame: &Frame) -> Result<FrameReport, FrameError> {
        let report = self.session.lock().process_frame(frame)?;
        self.emit(PipelineEvent::FrameProcessed(report.clone()));
        if let Some(range) = report.range {
            self.emit(PipelineEvent::ChartUpdated(range));
        }
        Ok(report)
    }

    /// Processing loop run on the worker thread.
    fn run(
        &self,
        sink: FrameSink,
        frames: Receiver<Frame>,
        failures: Receiver<SourceError>,
        stop: Receiver<()>,
    ) {
        loop {
            select! {
                recv(frames) -> msg => match msg {
                    Ok(frame) => match panic::catch_unwind(AssertUnwindSafe(|| self.process(&frame))) {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => {
                            warn!(timestamp = frame.timestamp, error = %e, "frame skipped");
                        }
                        Err(payload) => {
                            let message = panic_message(payload.as_ref());
                            error!(timestamp = frame.timestamp, %message, "frame processing panicked");
                            sink.close();
                            if self.running.swap(false, Ordering::AcqRel) {
                                self.emit(PipelineEvent::WorkerFailed(message));
                            }
                            break;
                        }
                    },
                    Err(_) => break,
                },
                recv(failures) -> msg => {
                    sink.close();
                    if let Ok(err) = msg
                        && self.running.swap(false, Ordering::AcqRel)
                    {
                        error!(error = %err, "stopping after source failure");
                        self.emit(PipelineEvent::SourceFailed(err.0));
                    }
                    break;
                },
                recv(stop) -> _ => break,
            }
        }
        debug!("processing loop exited");
    }
}

struct Worker {
    sink: FrameSink,
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Control {
    source: Option<Box<dyn FrameSource>>,
    worker: Option<Worker>,
    started_once: bool,
}

/// Thread-safe tracking pipeline.
///
/// Frames arrive through a [`FrameSink`], from an attached [`FrameSource`]
/// or pushed directly, and are processed in arrival order on one worker
/// thread. Operator actions (creating or removing ROIs, changing settings,
/// exporting) may be called from any thread while frames are processed.
pub struct TrackingPipeline {
    shared: Arc<Shared>,
    control: Mutex<Control>,
}

impl TrackingPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        let session = Session::new(config)?;
        Ok(Self {
            shared: Arc::new(Shared {
                session: Mutex::new(session),
                subscribers: Mutex::new(Vec::new()),
                running: AtomicBool::new(false),
            }),
            control: Mutex::new(Control::default()),
        })
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> Receiver<PipelineEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.shared.subscribers.lock().push(tx);
        rx
    }

    /// Run `f` with exclusive access to the session.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.shared.session.lock())
    }

    /// Process one frame on the calling thread.
    pub fn process_frame(&self, frame: &Frame) -> Result<FrameReport, FrameError> {
        self.shared.process(frame)
    }

    pub fn create_roi(&self, roi: Rect) -> usize {
        self.with_session(|s| s.create_roi(roi))
    }

    pub fn create_roi_with(&self, roi: Rect, tracker: Box<dyn TrackerAlgorithm>) -> usize {
        self.with_session(|s| s.create_roi_with(roi, tracker))
    }

    pub fn remove_at(&self, x: f64, y: f64) -> Option<Removed> {
        self.with_session(|s| s.remove_at(x, y))
    }

    pub fn remove_all(&self) {
        self.with_session(Session::remove_all);
    }

    pub fn len(&self) -> usize {
        self.with_session(|s| s.registry().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn series(&self) -> Vec<SeriesPair> {
        self.with_session(|s| s.series())
    }

    pub fn chart_range(&self) -> Option<ChartRange> {
        self.with_session(|s| s.chart_range())
    }

    /// Takes effect on the next appended sample.
    pub fn set_capacity(&self, capacity: usize) -> Result<(), ConfigError> {
        self.with_session(|s| s.set_capacity(capacity))
    }

    pub fn set_flip_vertical(&self, flip: bool) {
        self.with_session(|s| s.set_flip_vertical(flip));
    }

    pub fn set_visibility(&self, visibility: SeriesVisibility) -> Option<ChartRange> {
        let range = self.with_session(|s| s.set_visibility(visibility));
        if let Some(range) = range {
            self.shared.emit(PipelineEvent::ChartUpdated(range));
        }
        range
    }

    pub fn export_table<W: Write>(&self, writer: W) -> Result<usize, ExportError> {
        self.with_session(|s| s.export_table(writer))
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Sink feeding the running worker, or `None` while stopped.
    pub fn sink(&self) -> Option<FrameSink> {
        if !self.is_running() {
            return None;
        }
        self.control.lock().worker.as_ref().map(|w| w.sink.clone())
    }

    /// Start processing and start the attached source, if any.
    ///
    /// Starting again after a stop begins a new take and clears all ROIs.
    /// Calling `start` while running does nothing.
    pub fn start(&self) -> Result<(), PipelineError> {
        let mut control = self.control.lock();
        if self.is_running() {
            return Ok(());
        }
        self.shutdown(&mut control);
        if control.started_once {
            self.with_session(Session::new_take);
        }

        let policy = self.with_session(|s| s.config().overrun);
        let (sink, frames, failures) = FrameSink::channel(policy);
        let (stop, stop_rx) = crossbeam_channel::bounded(0);
        let shared = Arc::clone(&self.shared);
        let worker_sink = sink.clone();
        self.shared.running.store(true, Ordering::Release);
        let handle = thread::Builder::new()
            .name("roitrack-pipeline".into())
            .spawn(move || shared.run(worker_sink, frames, failures, stop_rx))
            .map_err(|e| {
                self.shared.running.store(false, Ordering::Release);
                PipelineError::Spawn(e)
            })?;

        control.worker = Some(Worker {
            sink: sink.clone(),
            stop,
            handle,
        });
        control.started_once = true;

        if let Some(source) = control.source.as_mut() {
            if let Err(e) = source.start(sink) {
                error!(source = source.name(), error = %e, "failed to start source");
                self.shared.running.store(false, Ordering::Release);
                self.shutdown(&mut control);
                return Err(e.into());
            }
            info!(source = source.name(), "source started");
        }
        info!(?policy, "pipeline started");
        Ok(())
    }

    /// Stop the source and the worker. Collected series are kept for export;
    /// the time origin is reset. `Stopped` is emitted only when the pipeline
    /// was running.
    pub fn stop(&self) {
        let mut control = self.control.lock();
        let was_running = self.shared.running.swap(false, Ordering::AcqRel);
        self.shutdown(&mut control);
        // also after a source failure already cleared `running`
        self.shared.session.lock().clock.reset();
        if was_running {
            self.shared.emit(PipelineEvent::Stopped);
            info!("pipeline stopped");
        }
    }

    /// Replace the frame source. Stops the pipeline, clears all ROIs and
    /// series, then starts again with `source`.
    pub fn switch_source(&self, source: Box<dyn FrameSource>) -> Result<(), PipelineError> {
        self.stop();
        {
            let mut control = self.control.lock();
            info!(source = source.name(), "switching source");
            control.source = Some(source);
            // new_take below; start() must not clear a second time
            control.started_once = false;
        }
        self.with_session(Session::new_take);
        self.start()
    }

    /// Close the sink, stop the source, then stop and join the worker.
    fn shutdown(&self, control: &mut Control) {
        let Some(worker) = control.worker.take() else {
            return;
        };
        worker.sink.close();
        if let Some(source) = control.source.as_mut() {
            source.stop();
        }
        drop(worker.stop);
        if worker.handle.join().is_err() {
            error!("processing thread panicked");
        }
    }
}

impl Drop for TrackingPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}
