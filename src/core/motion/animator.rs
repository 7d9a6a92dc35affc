use crate::core::motion::easing::{ease_out_cubic, interpolate};
use crate::domain::models::{Position, Trajectory};
use tokio::time::Instant;

pub type PositionListener = Box<dyn FnMut(Position) + Send>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationStep {
    Frame(Position),
    Complete(Position),
}

/// Not self-scheduling: the host calls [`MotionAnimator::step`] once per frame.
pub struct MotionAnimator {
    displayed: Position,
    active: Option<Trajectory>,
    generation: u64,
    frame_listeners: Vec<PositionListener>,
    complete_listeners: Vec<PositionListener>,
}

impl MotionAnimator {
    pub fn new(initial: Position) -> Self {
        Self {
            displayed: initial,
            active: None,
            generation: 0,
            frame_listeners: Vec::new(),
            complete_listeners: Vec::new(),
        }
    }

    pub fn displayed(&self) -> Position {
        self.displayed
    }

    pub fn is_animating(&self) -> bool {
        self.active.is_some()
    }

    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.active.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn on_frame(&mut self, listener: PositionListener) {
        self.frame_listeners.push(listener);
    }

    pub fn on_complete(&mut self, listener: PositionListener) {
        self.complete_listeners.push(listener);
    }

    pub fn animate(
        &mut self,
        start: Position,
        end: Position,
        duration_ms: u64,
        now: Instant,
    ) -> u64 {
        let start = if self.active.is_some() {
            self.displayed
        } else {
            start
        };
        self.generation += 1;
        self.displayed = start;
        self.active = Some(Trajectory {
            start,
            end,
            started_at: now,
            duration_ms,
        });
        tracing::debug!(
            generation = self.generation,
            duration_ms,
            "trajectory started"
        );
        self.generation
    }

    pub fn cancel(&mut self) {
        if self.active.take().is_some() {
            self.generation += 1;
            tracing::debug!(generation = self.generation, "trajectory cancelled");
        }
    }

    pub fn step(&mut self, now: Instant) -> Option<AnimationStep> {
        let trajectory = self.active?;
        let fraction = trajectory.fraction(now);
        if fraction < 1.0 {
            let position = interpolate(trajectory.start, trajectory.end, ease_out_cubic(fraction));
            self.displayed = position;
            for listener in self.frame_listeners.iter_mut() {
                listener(position);
            }
            return Some(AnimationStep::Frame(position));
        }

        self.active = None;
        self.displayed = trajectory.end;
        for listener in self.complete_listeners.iter_mut() {
            listener(trajectory.end);
        }
        Some(AnimationStep::Complete(trajectory.end))
    }
}

#[cfg(test)]
mod tests {
    use super::{AnimationStep, MotionAnimator};
    use crate::domain::models::Position;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;

    const P0: Position = Position::new(23.8, 90.4);
    const P1: Position = Position::new(23.81, 90.41);
    const P2: Position = Position::new(23.82, 90.39);

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut animator = MotionAnimator::new(P0);
        animator.cancel();
        animator.cancel();
        assert_eq!(animator.generation(), 0);
        assert_eq!(animator.displayed(), P0);
        assert!(animator.step(Instant::now()).is_none());

        let now = Instant::now();
        animator.animate(P0, P1, 500, now);
        animator.cancel();
        let after_first = animator.generation();
        animator.cancel();
        assert_eq!(animator.generation(), after_first);
        assert!(!animator.is_animating());
        assert!(animator.step(now + ms(100)).is_none());
    }

    #[test]
    fn frames_stay_on_segment_and_progress_monotonically() {
        let mut animator = MotionAnimator::new(P0);
        let started = Instant::now();
        animator.animate(P0, P1, 1000, started);

        let mut last_progress = 0.0;
        let mut elapsed = 0;
        loop {
            elapsed += 16;
            match animator.step(started + ms(elapsed)) {
                Some(AnimationStep::Frame(position)) => {
                    let lat_progress = (position.latitude - P0.latitude) / (P1.latitude - P0.latitude);
                    let lng_progress =
                        (position.longitude - P0.longitude) / (P1.longitude - P0.longitude);
                    assert!((lat_progress - lng_progress).abs() < 1e-6);
                    assert!((0.0..=1.0).contains(&lat_progress));
                    assert!(lat_progress >= last_progress);
                    last_progress = lat_progress;
                }
                Some(AnimationStep::Complete(position)) => {
                    assert_eq!(position, P1);
                    break;
                }
                None => panic!("animation ended without completion"),
            }
        }
        assert!(elapsed >= 1000);
    }

    #[test]
    fn completion_is_exact_and_emitted_once() {
        let mut animator = MotionAnimator::new(P0);
        let completions = Arc::new(Mutex::new(Vec::new()));
        let sink = completions.clone();
        animator.on_complete(Box::new(move |position| sink.lock().unwrap().push(position)));

        let start = Position::new(0.1, 0.1);
        let end = Position::new(0.3, 0.7);
        let started = Instant::now();
        animator.animate(start, end, 700, started);
        for elapsed in (0..700).step_by(33) {
            animator.step(started + ms(elapsed));
        }
        assert_eq!(
            animator.step(started + ms(700)),
            Some(AnimationStep::Complete(end))
        );
        assert!(animator.step(started + ms(800)).is_none());
        assert_eq!(animator.displayed(), end);
        assert_eq!(*completions.lock().unwrap(), vec![end]);
    }

    #[test]
    fn superseding_trajectory_starts_from_displayed_position() {
        let mut animator = MotionAnimator::new(P0);
        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink = frames.clone();
        animator.on_frame(Box::new(move |position| sink.lock().unwrap().push(position)));

        let started = Instant::now();
        animator.animate(P0, P1, 1000, started);
        animator.step(started + ms(300));
        let displayed = animator.displayed();
        assert!(!displayed.approx_eq(&P0, 1e-9));

        let resumed = started + ms(300);
        animator.animate(P1, P2, 1000, resumed);
        let trajectory = *animator.trajectory().unwrap();
        assert_eq!(trajectory.start, displayed);
        assert_eq!(trajectory.end, P2);

        frames.lock().unwrap().clear();
        animator.step(resumed + ms(16));
        let frames = frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        // Nothing from the first trajectory: the new frame lies on displayed -> P2.
        let lat_progress = (frames[0].latitude - displayed.latitude) / (P2.latitude - displayed.latitude);
        let lng_progress =
            (frames[0].longitude - displayed.longitude) / (P2.longitude - displayed.longitude);
        assert!((lat_progress - lng_progress).abs() < 1e-6);
    }

    #[test]
    fn idle_animate_uses_requested_start() {
        let mut animator = MotionAnimator::new(P0);
        animator.animate(P1, P2, 500, Instant::now());
        assert_eq!(animator.trajectory().unwrap().start, P1);
        assert_eq!(animator.displayed(), P1);
    }

    #[test]
    fn zero_duration_completes_on_next_step() {
        let mut animator = MotionAnimator::new(P0);
        let now = Instant::now();
        animator.animate(P0, P1, 0, now);
        assert_eq!(animator.step(now), Some(AnimationStep::Complete(P1)));
    }
}
