// src/main.rs

use std::sync::Arc;

use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    window::WindowBuilder,
};

use sandbox3d::config::{SandboxConfig, CONFIG_FILE};
use sandbox3d::engine_lib::time::FrameClock;
use sandbox3d::{AppError, SandboxApp};

pub async fn run() -> Result<(), AppError> {
    let settings = SandboxConfig::load_or_default(CONFIG_FILE)?;

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(settings.window.title.as_str())
            .with_inner_size(winit::dpi::LogicalSize::new(settings.window.width, settings.window.height))
            .build(&event_loop)?,
    );

    let mut app_state = SandboxApp::new(window.clone(), settings).await?;
    let mut clock = FrameClock::new();

    event_loop.run(move |event, target: &EventLoopWindowTarget<()>| {
        target.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { ref event, window_id } if window_id == window.id() => {
                if !app_state.handle_window_event(event, &window) {
                    match event {
                        WindowEvent::CloseRequested => {
                            log::info!("Close requested after {} frames", clock.frame_count());
                            target.exit();
                        }
                        WindowEvent::Resized(physical_size) => {
                            app_state.resize(*physical_size);
                        }
                        _ => {}
                    }
                }
            }
            Event::DeviceEvent { event: device_event, .. } => {
                app_state.handle_device_event(&device_event);
            }
            Event::AboutToWait => {
                let dt = clock.tick();
                app_state.set_fps(clock.fps());
                app_state.update(dt);
                match app_state.render(&window) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        app_state.resize(app_state.get_size());
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("GPU out of memory, exiting");
                        target.exit();
                    }
                    Err(e) => log::warn!("Surface error: {:?}", e),
                }

                if !target.exiting() {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    })?;
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
