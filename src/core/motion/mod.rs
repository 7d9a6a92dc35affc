pub mod animator;
pub mod easing;
