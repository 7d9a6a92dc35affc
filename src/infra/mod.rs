pub mod logging;
pub mod map;
pub mod storage;
pub mod transport;
