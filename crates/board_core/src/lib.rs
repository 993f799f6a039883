pub mod board;
pub mod config;
pub mod drag;
pub mod error;
pub mod mapper;
pub mod model;
pub mod remote;
pub mod storage;
pub mod sync;
pub mod task_api;
