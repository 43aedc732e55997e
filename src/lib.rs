// src/lib.rs

pub mod app;
pub mod config;
pub mod engine_lib;
pub mod rendering_lib;
pub mod ui;

pub use app::{AppError, SandboxApp};
pub use config::SandboxConfig;
