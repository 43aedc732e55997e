// src/rendering_lib/error.rs

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no suitable graphics adapter found")]
    NoAdapter,

    #[error("surface reports no supported texture format")]
    NoSurfaceFormat,

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to open graphics device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("GPU validation failed while creating {stage}: {message}")]
    Validation { stage: &'static str, message: String },
}

/// Runs `build` inside a validation error scope and turns any captured error
/// into `RenderError::Validation`.
pub async fn validated<T>(
    device: &wgpu::Device,
    stage: &'static str,
    build: impl FnOnce() -> T,
) -> Result<T, RenderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = build();
    match device.pop_error_scope().await {
        Some(err) => Err(RenderError::Validation { stage, message: err.to_string() }),
        None => Ok(value),
    }
}
