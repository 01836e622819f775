pub mod config;
pub mod pipeline;
pub mod process;
pub mod storage;
pub mod transform;
