// src/rendering_lib/mod.rs

pub mod error;
pub mod post_process;
pub mod renderer;
pub mod shader;
pub mod texture;
pub mod vertex;

pub use error::RenderError;
pub use post_process::{CaptureState, PostProcess};
pub use renderer::Renderer;
