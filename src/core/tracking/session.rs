use crate::core::tracking::controller::{FrameOutcome, TrackingController};
use crate::core::tracking::follow::FollowPan;
use crate::domain::models::{AppError, TrackerSettings, TrackingSnapshot};
use crate::infra::map::MapSurface;
use crate::infra::transport::TransportEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

struct Shared {
    session_id: String,
    controller: Mutex<TrackingController>,
    snapshots: watch::Sender<TrackingSnapshot>,
    frame_task: Mutex<Option<JoinHandle<()>>>,
    deferred: Mutex<Vec<JoinHandle<()>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

pub struct TrackingSession {
    shared: Arc<Shared>,
}

impl TrackingSession {
    pub fn start(settings: TrackerSettings, surface: Option<Box<dyn MapSurface>>) -> Self {
        let resize_delay = Duration::from_millis(settings.view.resize_delay_ms);
        let controller = TrackingController::new(settings, surface);
        let (snapshots, _) = watch::channel(controller.snapshot());
        let shared = Arc::new(Shared {
            session_id: Uuid::new_v4().to_string(),
            controller: Mutex::new(controller),
            snapshots,
            frame_task: Mutex::new(None),
            deferred: Mutex::new(Vec::new()),
            pump: Mutex::new(None),
            closed: AtomicBool::new(false),
        });
        tracing::info!(session_id = %shared.session_id, "tracking session started");
        // The map container settles its size after the first layout pass.
        shared.schedule_invalidate_size(resize_delay);
        Self { shared }
    }

    // A second call replaces the previous subscription.
    pub fn subscribe_transport(&self, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
        if self.shared.closed.load(Ordering::SeqCst) {
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("no async runtime available, live updates disabled");
            return;
        };
        let shared = Arc::clone(&self.shared);
        let handle = runtime.spawn(async move {
            while let Some(event) = events.recv().await {
                if let Err(error) = shared.handle_event(event) {
                    tracing::warn!("transport event not applied: {}", error.message);
                    break;
                }
            }
            tracing::info!(session_id = %shared.session_id, "transport stream ended");
        });
        if let Ok(mut pump) = self.shared.pump.lock() {
            if let Some(previous) = pump.replace(handle) {
                previous.abort();
            }
        }
    }

    pub fn handle_event(&self, event: TransportEvent) -> Result<(), AppError> {
        self.shared.handle_event(event)
    }

    pub fn snapshot(&self) -> Result<TrackingSnapshot, AppError> {
        Ok(self.shared.lock_controller().snapshot())
    }

    pub fn watch(&self) -> watch::Receiver<TrackingSnapshot> {
        self.shared.snapshots.subscribe()
    }

    pub fn center_on_rider(&self) -> Result<bool, AppError> {
        self.shared.lock_controller().center_on_rider()
    }

    pub fn reset_view(&self) -> Result<(), AppError> {
        self.shared.lock_controller().reset_view()
    }

    pub fn zoom_in(&self) -> Result<(), AppError> {
        self.shared.lock_controller().zoom_in()
    }

    pub fn zoom_out(&self) -> Result<(), AppError> {
        self.shared.lock_controller().zoom_out()
    }

    pub fn notify_resize(&self) -> Result<(), AppError> {
        self.shared.ensure_open()?;
        let delay = Duration::from_millis(
            self.shared.lock_controller().settings().view.resize_delay_ms,
        );
        self.shared.schedule_invalidate_size(delay);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn shutdown(&self) {
        self.shared.shutdown();
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}

impl Shared {
    // A panicking surface sink poisons the lock mid-frame. The controller state is
    // still coherent, so keep serving it; the dead frame task's claim is released.
    fn lock_controller(&self) -> MutexGuard<'_, TrackingController> {
        match self.controller.lock() {
            Ok(controller) => controller,
            Err(poisoned) => {
                tracing::warn!(session_id = %self.session_id, "recovering tracking controller after a panic");
                self.controller.clear_poison();
                let mut controller = poisoned.into_inner();
                controller.end_frame_loop();
                controller
            }
        }
    }

    fn ensure_open(&self) -> Result<(), AppError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AppError::new(
                "SESSION_CLOSED",
                "tracking session has been shut down",
                None,
            ));
        }
        Ok(())
    }

    fn publish(&self) {
        let snapshot = self.lock_controller().snapshot();
        self.snapshots.send_replace(snapshot);
    }

    fn handle_event(self: &Arc<Self>, event: TransportEvent) -> Result<(), AppError> {
        self.ensure_open()?;
        let (pan, start_frames, snapshot) = {
            let mut controller = self.lock_controller();
            let pan = controller.on_transport_event(event, Instant::now());
            let start_frames = controller.begin_frame_loop();
            (pan, start_frames, controller.snapshot())
        };
        if start_frames {
            self.spawn_frame_loop();
        }
        if let Some(pan) = pan {
            self.schedule_follow_pan(pan);
        }
        self.snapshots.send_replace(snapshot);
        Ok(())
    }

    fn spawn_frame_loop(self: &Arc<Self>) {
        let Ok(runtime) = Handle::try_current() else {
            tracing::debug!("no frame scheduler available, animation skipped");
            self.lock_controller().end_frame_loop();
            return;
        };
        let period = self.lock_controller().settings().motion.frame_interval_ms.max(1);
        let shared = Arc::clone(self);
        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(period));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                let now = ticker.tick().await;
                let outcome = shared.lock_controller().on_frame(now);
                match outcome {
                    FrameOutcome::Animating => continue,
                    FrameOutcome::Completed => shared.publish(),
                    FrameOutcome::Idle => {}
                }
                if !shared.lock_controller().animator().is_animating() {
                    break;
                }
            }
        });
        if let Ok(mut frame_task) = self.frame_task.lock() {
            if let Some(previous) = frame_task.replace(handle) {
                previous.abort();
            }
        }
    }

    fn schedule_follow_pan(self: &Arc<Self>, pan: FollowPan) {
        let shared = Arc::clone(self);
        self.spawn_deferred(pan.delay, move || {
            shared.lock_controller().run_follow_pan(&pan);
        });
    }

    fn schedule_invalidate_size(self: &Arc<Self>, delay: Duration) {
        let shared = Arc::clone(self);
        self.spawn_deferred(delay, move || {
            if let Err(error) = shared.lock_controller().invalidate_size() {
                tracing::debug!("invalidate size skipped: {}", error.message);
            }
        });
    }

    fn spawn_deferred<F>(&self, delay: Duration, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            tracing::debug!("no async runtime available, deferred work skipped");
            return;
        };
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            work();
        });
        if let Ok(mut deferred) = self.deferred.lock() {
            deferred.retain(|task| !task.is_finished());
            deferred.push(handle);
        }
    }

    // Every step runs even if an earlier one fails.
    fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut controller = self.lock_controller();
        controller.cancel_pending();

        let frame_task = self
            .frame_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = frame_task {
            task.abort();
        }
        let deferred = std::mem::take(
            &mut *self.deferred.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for task in deferred {
            task.abort();
        }

        let pump = self.pump.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(pump) = pump {
            pump.abort();
        }

        if let Err(error) = controller.release_surface() {
            tracing::warn!("map surface release failed: {error}");
        }
        self.snapshots.send_replace(controller.snapshot());
        tracing::info!(session_id = %self.session_id, "tracking session shut down");
    }
}
