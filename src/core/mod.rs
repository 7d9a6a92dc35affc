pub mod motion;
pub mod tracking;
