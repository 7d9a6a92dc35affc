use crate::domain::models::{FollowSettings, PanOptions, Position};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowPan {
    pub generation: u64,
    pub target: Position,
    pub delay: Duration,
    pub options: PanOptions,
}

// One armed pan at a time. Samples landing while it is armed retarget it
// without pushing its deadline back, so a steady stream still moves the camera.
#[derive(Debug, Clone, Default)]
pub struct FollowCamera {
    generation: u64,
    pending: Option<FollowPan>,
}

impl FollowCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan(
        &mut self,
        target: Position,
        duration_ms: u64,
        cfg: &FollowSettings,
    ) -> Option<FollowPan> {
        let options = PanOptions {
            duration_seconds: duration_ms as f64 / 1000.0,
            ease_linearity: cfg.ease_linearity,
        };
        if let Some(pending) = self.pending.as_mut() {
            pending.target = target;
            pending.options = options;
            return None;
        }
        self.generation += 1;
        let delay_ms = (duration_ms as f64 * cfg.delay_ratio.clamp(0.0, 1.0)).round() as u64;
        let pan = FollowPan {
            generation: self.generation,
            target,
            delay: Duration::from_millis(delay_ms),
            options,
        };
        self.pending = Some(pan);
        Some(pan)
    }

    pub fn is_current(&self, pan: &FollowPan) -> bool {
        self.pending
            .is_some_and(|pending| pending.generation == pan.generation)
    }

    pub fn take_due(&mut self, pan: &FollowPan) -> Option<FollowPan> {
        if !self.is_current(pan) {
            return None;
        }
        self.pending.take()
    }

    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.pending = None;
    }
}
