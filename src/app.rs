// src/app.rs

use std::sync::Arc;

use glam::Vec3;
use winit::{
    event::{DeviceEvent, WindowEvent},
    keyboard::KeyCode,
    window::Window,
};

use crate::config::{ConfigError, SandboxConfig};
use crate::engine_lib::assets::TextureRegistry;
use crate::engine_lib::camera::Camera;
use crate::engine_lib::controller::InputState;
use crate::engine_lib::model::Model;
use crate::engine_lib::obj::ObjError;
use crate::engine_lib::player::{Player, PlayerOutcome};
use crate::engine_lib::scene::{Projection, Scene, SceneError, SinkingPlatform};
use crate::rendering_lib::{CaptureState, PostProcess, RenderError, Renderer};
use crate::ui::{build_ui, HudState};

/// Everything that can stop the sandbox from starting.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("failed to load player model: {0}")]
    PlayerModel(#[from] ObjError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),
}

pub struct SandboxApp {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    renderer: Renderer,
    post: PostProcess,
    scene: Scene,
    camera: Camera,
    player: Player,
    input: InputState,
    settings: SandboxConfig,
    bloom_enabled: bool,
    game_over: bool,
    fps: f32,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl SandboxApp {
    pub async fn new(window: Arc<Window>, settings: SandboxConfig) -> Result<Self, AppError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone()).map_err(RenderError::from)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        log::info!("Using adapter {:?}", adapter.get_info().name);
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    label: Some("Sandbox Device"),
                },
                None,
            )
            .await
            .map_err(RenderError::from)?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let cam = settings.camera;
        let mut scene = Scene::new(Projection {
            fov_y_deg: cam.fov_y_deg,
            aspect: config.width as f32 / config.height as f32,
            near: cam.near,
            far: cam.far,
        });
        let mut textures = TextureRegistry::new();
        scene.load_from_file(&settings.assets.scene, &mut textures)?;
        if let Some(sink) = settings.sinking_platform {
            scene.add_script(Box::new(SinkingPlatform { model: sink.model, rest_on: sink.rest_on, speed: sink.speed }));
        }
        log::info!(
            "Scene {} loaded: {} models, {} textures",
            settings.assets.scene.display(),
            scene.models.len(),
            textures.len()
        );

        let player_model = Model::load_from_file(&settings.assets.player_model)?;
        let player = Player::new(player_model, settings.player);

        let mut renderer = Renderer::new(&device, &queue).await?;
        renderer.upload_scene(&device, &queue, &scene, &textures).await?;
        renderer.upload_player(&device, &player.model).await?;

        let post = PostProcess::new(&device, config.format, config.width, config.height).await?;

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, None, 1);

        let mut camera = Camera::new(Vec3::from_array(cam.position), Vec3::from_array(cam.front));
        camera.track(player.position(), player.eye_offset(cam.eye_height));

        let mut input = InputState::new();
        if window.has_focus() {
            input.grab_cursor(&window, true);
        }

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            renderer,
            post,
            scene,
            camera,
            player,
            input,
            bloom_enabled: settings.bloom.enabled,
            settings,
            game_over: false,
            fps: 0.0,
            egui_ctx,
            egui_state,
            egui_renderer,
        })
    }

    pub fn get_size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.post.resize(&self.device, new_size.width, new_size.height);
            self.scene.set_viewport(new_size.width, new_size.height);
        }
    }

    pub fn set_fps(&mut self, fps: f32) {
        self.fps = fps;
    }

    pub fn update(&mut self, dt: f32) {
        if self.input.just_pressed(KeyCode::KeyB) {
            self.bloom_enabled = !self.bloom_enabled;
            log::info!("Bloom {}", if self.bloom_enabled { "enabled" } else { "disabled" });
        }
        if self.game_over && self.input.just_pressed(KeyCode::KeyR) {
            self.player.respawn();
            self.game_over = false;
        }

        self.camera.process_input(&self.input, dt);
        if let Some((x, y)) = self.input.take_cursor_motion() {
            self.camera.mouse_callback(x, y);
        }

        if !self.game_over {
            self.player.process_input(&self.input, &self.camera);
            if self.player.apply_physics(dt, &self.scene, &self.camera) == PlayerOutcome::Dead {
                self.game_over = true;
            }
        }

        self.scene.update(dt);
        let offset = self.player.eye_offset(self.settings.camera.eye_height);
        self.camera.track(self.player.position(), offset);
        self.input.end_frame();
    }

    pub fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        let output_texture = self.surface.get_current_texture()?;
        let view = output_texture.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Main Command Encoder"),
        });

        self.renderer.prepare(&self.device, &self.queue, &self.scene, &self.player.model, &self.camera);
        {
            let mut pass = self.post.begin_render(&mut encoder);
            self.renderer.draw(&mut pass);
        }

        let capture = if self.bloom_enabled {
            let bloom = self.settings.bloom;
            self.post.apply_bloom(&self.queue, &mut encoder, &view, bloom.threshold, bloom.strength)
        } else {
            self.post.resolve(&self.queue, &mut encoder, &view)
        };
        if capture == CaptureState::Stale {
            log::debug!("Frame presented from a stale capture");
        }

        let hud = HudState {
            health: self.player.health,
            max_health: self.player.tuning.max_health,
            free_fly: self.camera.free_fly,
            show_colliders: self.camera.show_colliders,
            bloom: self.bloom_enabled,
            cursor_grabbed: self.input.cursor_grabbed,
            game_over: self.game_over,
            fps: self.fps,
        };
        let raw_input = self.egui_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| build_ui(ctx, &hud));
        self.egui_state.handle_platform_output(window, full_output.platform_output);
        let tris = self.egui_ctx.tessellate(full_output.shapes, self.egui_ctx.pixels_per_point());
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, image_delta);
        }
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };
        self.egui_renderer.update_buffers(&self.device, &self.queue, &mut encoder, &tris, &screen_descriptor);
        {
            let mut gui_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("HUD Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.egui_renderer.render(&mut gui_pass, &tris, &screen_descriptor);
        }
        for tex_id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(tex_id);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output_texture.present();
        Ok(())
    }

    /// Returns true when the event was consumed by the HUD or the input state.
    pub fn handle_window_event(&mut self, event: &WindowEvent, window: &Window) -> bool {
        if self.egui_state.on_window_event(window, event).consumed {
            return true;
        }
        self.input.handle_window_event(event, window)
    }

    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        self.input.handle_device_event(event);
    }
}
