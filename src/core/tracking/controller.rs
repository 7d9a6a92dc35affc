use crate::core::motion::animator::{AnimationStep, MotionAnimator};
use crate::core::tracking::follow::{FollowCamera, FollowPan};
use crate::core::tracking::rate_guard::{RateGuard, RateVerdict};
use crate::domain::models::{
    AppError, FlyOptions, LocationSample, MotionSettings, Position, TrackerSettings,
    TrackingSnapshot,
};
use crate::domain::state_machine::{ConnectionMachine, ConnectionStatus};
use crate::infra::map::{haversine_distance, MapSurface, SurfaceError};
use crate::infra::transport::TransportEvent;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Animating,
    Completed,
    Idle,
}

// `current_position` only moves when a trajectory completes.
#[derive(Debug, Clone, Default)]
pub struct EntityState {
    pub connection: ConnectionMachine,
    pub current_position: Option<Position>,
    pub target_position: Option<Position>,
    pub last_update_at: Option<DateTime<Utc>>,
}

pub fn derive_duration_ms(distance_m: f64, cfg: &MotionSettings) -> u64 {
    let min = cfg.min_duration_ms as f64;
    let max = cfg.max_duration_ms.max(cfg.min_duration_ms) as f64;
    let raw = if distance_m.is_finite() && cfg.meters_per_ms > 0.0 {
        distance_m / cfg.meters_per_ms
    } else {
        max
    };
    raw.clamp(min, max).round() as u64
}

pub fn popup_html(position: Position, sample: &LocationSample) -> String {
    let mut html = format!(
        "<b>Rider Location</b><br>Lat: {:.6}<br>Lng: {:.6}<br>",
        position.latitude, position.longitude
    );
    if let Some(speed) = sample.display_speed() {
        html.push_str(&format!("Speed: {speed:.1} km/h"));
    }
    if let Some(bearing) = sample.display_bearing() {
        html.push_str(&format!("<br>Bearing: {bearing:.0}°"));
    }
    html
}

pub struct TrackingController {
    settings: TrackerSettings,
    surface: Option<Box<dyn MapSurface>>,
    animator: MotionAnimator,
    camera: FollowCamera,
    rate_guard: RateGuard,
    entity: EntityState,
    frame_loop_active: bool,
    shut_down: bool,
}

impl TrackingController {
    pub fn new(settings: TrackerSettings, surface: Option<Box<dyn MapSurface>>) -> Self {
        if surface.is_none() {
            tracing::warn!("map surface unavailable, tracking without a marker");
        }
        let animator = MotionAnimator::new(settings.view.default_center);
        let rate_guard = RateGuard::new(&settings.rate_guard);
        Self {
            settings,
            surface,
            animator,
            camera: FollowCamera::new(),
            rate_guard,
            entity: EntityState::default(),
            frame_loop_active: false,
            shut_down: false,
        }
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn animator(&self) -> &MotionAnimator {
        &self.animator
    }

    pub fn animator_mut(&mut self) -> &mut MotionAnimator {
        &mut self.animator
    }

    pub fn entity(&self) -> &EntityState {
        &self.entity
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.entity.connection.state()
    }

    pub fn burst_count(&self) -> u64 {
        self.rate_guard.burst_count()
    }

    pub fn snapshot(&self) -> TrackingSnapshot {
        let status = self.entity.connection.state();
        TrackingSnapshot {
            connection_status: status,
            status_label: status.label(),
            current_position: self.entity.current_position,
            target_position: self.entity.target_position,
            displayed_position: self.animator.displayed(),
            last_update_at: self.entity.last_update_at,
        }
    }

    pub fn on_transport_event(&mut self, event: TransportEvent, now: Instant) -> Option<FollowPan> {
        let transition = match event {
            TransportEvent::LocationUpdate(update) => {
                let sample = LocationSample::from_update(update, Utc::now());
                return self.on_location_sample(sample, now);
            }
            TransportEvent::Connect => self.entity.connection.connect(),
            TransportEvent::Disconnect => self.entity.connection.disconnect(),
            TransportEvent::ConnectError { message } => {
                tracing::error!("transport connection error: {message}");
                self.entity.connection.connect_error()
            }
            TransportEvent::Reconnecting(attempt) => self.entity.connection.reconnecting(attempt),
        };
        match transition {
            Ok(()) => tracing::info!(status = %self.entity.connection.state(), "connection status changed"),
            Err(error) => tracing::debug!("{}", error.message),
        }
        None
    }

    pub fn on_location_sample(&mut self, sample: LocationSample, now: Instant) -> Option<FollowPan> {
        if self.shut_down {
            return None;
        }
        let Some(end) = sample.position() else {
            tracing::debug!("dropping location sample without usable coordinates");
            return None;
        };

        let verdict = self.rate_guard.observe(now);
        if verdict == RateVerdict::Burst {
            tracing::debug!(
                bursts = self.rate_guard.burst_count(),
                "location samples arriving faster than the rate guard interval"
            );
            if self.rate_guard.should_drop(verdict) {
                return None;
            }
        }

        let start = self.animator.displayed();
        let distance = match self.surface.as_ref() {
            Some(surface) => surface.distance_between(start, end),
            None => haversine_distance(start, end),
        };
        let duration_ms = derive_duration_ms(distance, &self.settings.motion);
        self.animator.animate(start, end, duration_ms, now);

        let popup = popup_html(end, &sample);
        self.with_marker(|surface| surface.set_popup_content(&popup));

        let pan = self.camera.plan(end, duration_ms, &self.settings.follow);
        self.entity.target_position = Some(end);
        self.entity.last_update_at = Some(sample.received_at);
        tracing::debug!(
            distance_m = distance,
            duration_ms,
            pan_scheduled = pan.is_some(),
            "location sample accepted"
        );
        pan
    }

    // True when the caller must start ticking.
    pub fn begin_frame_loop(&mut self) -> bool {
        if self.shut_down || self.frame_loop_active || !self.animator.is_animating() {
            return false;
        }
        self.frame_loop_active = true;
        true
    }

    pub fn end_frame_loop(&mut self) {
        self.frame_loop_active = false;
    }

    pub fn on_frame(&mut self, now: Instant) -> FrameOutcome {
        let outcome = match self.animator.step(now) {
            Some(AnimationStep::Frame(position)) => {
                self.with_marker(|surface| surface.set_position(position));
                FrameOutcome::Animating
            }
            Some(AnimationStep::Complete(position)) => {
                self.with_marker(|surface| surface.set_position(position));
                self.entity.current_position = Some(position);
                FrameOutcome::Completed
            }
            None => FrameOutcome::Idle,
        };
        if !self.animator.is_animating() {
            self.frame_loop_active = false;
        }
        outcome
    }

    // Pans to the newest target recorded for `pan`. False when stale or headless.
    pub fn run_follow_pan(&mut self, pan: &FollowPan) -> bool {
        if self.shut_down {
            return false;
        }
        let Some(due) = self.camera.take_due(pan) else {
            return false;
        };
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        match surface.pan_to(due.target, due.options) {
            Ok(()) => true,
            Err(error) => {
                tracing::debug!("follow pan skipped: {error}");
                false
            }
        }
    }

    pub fn center_on_rider(&mut self) -> Result<bool, AppError> {
        let Some(current) = self.entity.current_position else {
            return Ok(false);
        };
        let zoom = self.settings.view.center_zoom;
        let options = FlyOptions {
            duration_seconds: self.settings.view.fly_duration_seconds,
            ease_linearity: self.settings.follow.ease_linearity,
        };
        self.with_surface(|surface| surface.fly_to(current, zoom, options))?;
        Ok(true)
    }

    pub fn reset_view(&mut self) -> Result<(), AppError> {
        let center = self.settings.view.default_center;
        let zoom = self.settings.view.default_zoom;
        self.with_surface(|surface| surface.set_view(center, zoom))
    }

    pub fn zoom_in(&mut self) -> Result<(), AppError> {
        let step = self.settings.view.zoom_step;
        self.with_surface(|surface| surface.zoom_in(step))
    }

    pub fn zoom_out(&mut self) -> Result<(), AppError> {
        let step = self.settings.view.zoom_step;
        self.with_surface(|surface| surface.zoom_out(step))
    }

    pub fn invalidate_size(&mut self) -> Result<(), AppError> {
        self.with_surface(|surface| surface.invalidate_size())
    }

    pub fn cancel_pending(&mut self) {
        self.animator.cancel();
        self.camera.invalidate();
        self.entity.connection.close();
        self.frame_loop_active = false;
        self.shut_down = true;
    }

    pub fn release_surface(&mut self) -> Result<(), SurfaceError> {
        match self.surface.take() {
            Some(mut surface) => surface.release(),
            None => Ok(()),
        }
    }

    fn with_marker<F>(&mut self, apply: F)
    where
        F: FnOnce(&mut dyn MapSurface) -> Result<(), SurfaceError>,
    {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if !surface.marker_present() {
            return;
        }
        if let Err(error) = apply(surface.as_mut()) {
            tracing::debug!("marker update skipped: {error}");
        }
    }

    fn with_surface<F>(&mut self, apply: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut dyn MapSurface) -> Result<(), SurfaceError>,
    {
        if self.shut_down {
            return Err(AppError::new(
                "SESSION_CLOSED",
                "tracking session has been shut down",
                None,
            ));
        }
        match self.surface.as_mut() {
            Some(surface) => apply(surface.as_mut()).map_err(AppError::from),
            None => {
                tracing::debug!("map surface unavailable, ignoring camera action");
                Ok(())
            }
        }
    }
}
