pub mod controller;
pub mod follow;
pub mod rate_guard;
pub mod session;
