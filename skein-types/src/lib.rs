pub mod block;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod primitives;
