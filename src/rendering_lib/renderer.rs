// src/rendering_lib/renderer.rs

use wgpu::util::DeviceExt;

use super::error::{validated, RenderError};
use super::post_process::{DEPTH_FORMAT, HDR_FORMAT};
use super::shader::{LINE_SHADER_SOURCE, SCENE_SHADER_SOURCE, SKYBOX_SHADER_SOURCE};
use super::texture::{linear_sampler, GpuTexture};
use super::vertex::{
    skybox_cube, CameraUniform, LightsUniform, MeshVertex, ModelUniform, PositionVertex, TangentVertex,
};

use crate::engine_lib::assets::{TextureId, TextureRegistry};
use crate::engine_lib::camera::Camera;
use crate::engine_lib::model::{Model, ShaderKind};
use crate::engine_lib::scene::Scene;

/// Fragment entry point per `ShaderKind`, in `ShaderKind::index` order.
const FRAGMENT_ENTRIES: [&str; 4] = ["fs_colored", "fs_textured", "fs_double_textured", "fs_parallax"];

struct GpuModel {
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    kind: ShaderKind,
    uniform_buffer: wgpu::Buffer,
    model_group: wgpu::BindGroup,
    texture_group: wgpu::BindGroup,
}

struct Layouts {
    frame: wgpu::BindGroupLayout,
    model: wgpu::BindGroupLayout,
    textures: wgpu::BindGroupLayout,
    skybox: wgpu::BindGroupLayout,
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, view_dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

impl Layouts {
    fn new(device: &wgpu::Device) -> Self {
        let d2 = wgpu::TextureViewDimension::D2;
        Self {
            frame: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("frame_bind_group_layout"),
                entries: &[
                    uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
                    uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
                ],
            }),
            model: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("model_bind_group_layout"),
                entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
            }),
            textures: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("texture_bind_group_layout"),
                entries: &[texture_entry(0, d2), texture_entry(1, d2), texture_entry(2, d2), sampler_entry(3)],
            }),
            skybox: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("skybox_bind_group_layout"),
                entries: &[texture_entry(0, wgpu::TextureViewDimension::Cube), sampler_entry(1)],
            }),
        }
    }
}

fn depth_state(write: bool, compare: wgpu::CompareFunction) -> Option<wgpu::DepthStencilState> {
    Some(wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: write,
        depth_compare: compare,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    })
}

fn hdr_target() -> [Option<wgpu::ColorTargetState>; 1] {
    [Some(wgpu::ColorTargetState {
        format: HDR_FORMAT,
        blend: None,
        write_mask: wgpu::ColorWrites::ALL,
    })]
}

/// Draws the scene into the HDR capture pass: skybox, models (or their
/// collider boxes), then the player.
pub struct Renderer {
    layouts: Layouts,
    model_pipelines: Vec<wgpu::RenderPipeline>,
    skybox_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    frame_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    white: GpuTexture,
    textures: Vec<GpuTexture>,
    models: Vec<GpuModel>,
    player: Option<GpuModel>,
    skybox_vertices: wgpu::Buffer,
    skybox: Option<(GpuTexture, wgpu::BindGroup)>,
    debug_lines: Option<(wgpu::Buffer, u32)>,
}

impl Renderer {
    pub async fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Self, RenderError> {
        validated(device, "scene pipelines", || Self::build(device, queue)).await
    }

    fn build(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let layouts = Layouts::new(device);

        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader Module"),
            source: wgpu::ShaderSource::Wgsl(SCENE_SHADER_SOURCE.into()),
        });
        let skybox_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Skybox Shader Module"),
            source: wgpu::ShaderSource::Wgsl(SKYBOX_SHADER_SOURCE.into()),
        });
        let line_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Line Shader Module"),
            source: wgpu::ShaderSource::Wgsl(LINE_SHADER_SOURCE.into()),
        });

        let model_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Model Pipeline Layout"),
            bind_group_layouts: &[&layouts.frame, &layouts.model, &layouts.textures],
            push_constant_ranges: &[],
        });
        let targets = hdr_target();
        let model_pipelines = ShaderKind::ALL
            .iter()
            .map(|kind| {
                let (vertex_entry, buffers) = if kind.uses_tangents() {
                    ("vs_tangent", [TangentVertex::desc()])
                } else {
                    ("vs_main", [MeshVertex::desc()])
                };
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(FRAGMENT_ENTRIES[kind.index()]),
                    layout: Some(&model_layout),
                    vertex: wgpu::VertexState { module: &scene_shader, entry_point: vertex_entry, buffers: &buffers },
                    fragment: Some(wgpu::FragmentState {
                        module: &scene_shader,
                        entry_point: FRAGMENT_ENTRIES[kind.index()],
                        targets: &targets,
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        front_face: wgpu::FrontFace::Ccw,
                        cull_mode: None,
                        ..Default::default()
                    },
                    depth_stencil: depth_state(true, wgpu::CompareFunction::Less),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                })
            })
            .collect();

        let skybox_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Skybox Pipeline Layout"),
            bind_group_layouts: &[&layouts.frame, &layouts.skybox],
            push_constant_ranges: &[],
        });
        let skybox_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Skybox Pipeline"),
            layout: Some(&skybox_layout),
            vertex: wgpu::VertexState {
                module: &skybox_shader,
                entry_point: "vs_skybox",
                buffers: &[PositionVertex::desc()],
            },
            fragment: Some(wgpu::FragmentState { module: &skybox_shader, entry_point: "fs_skybox", targets: &targets }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: depth_state(false, wgpu::CompareFunction::Always),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let line_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Line Pipeline Layout"),
            bind_group_layouts: &[&layouts.frame],
            push_constant_ranges: &[],
        });
        let line_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Collider Line Pipeline"),
            layout: Some(&line_layout),
            vertex: wgpu::VertexState {
                module: &line_shader,
                entry_point: "vs_line",
                buffers: &[PositionVertex::desc()],
            },
            fragment: Some(wgpu::FragmentState { module: &line_shader, entry_point: "fs_line", targets: &targets }),
            primitive: wgpu::PrimitiveState { topology: wgpu::PrimitiveTopology::LineList, ..Default::default() },
            depth_stencil: depth_state(true, wgpu::CompareFunction::Less),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Uniform Buffer"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lights_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lights Uniform Buffer"),
            contents: bytemuck::bytes_of(&LightsUniform::default()),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let frame_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &layouts.frame,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: lights_buffer.as_entire_binding() },
            ],
        });

        let skybox_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Skybox Vertex Buffer"),
            contents: bytemuck::cast_slice(&skybox_cube()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            layouts,
            model_pipelines,
            skybox_pipeline,
            line_pipeline,
            camera_buffer,
            frame_group,
            sampler: linear_sampler(device, "Model Sampler"),
            white: GpuTexture::white(device, queue),
            textures: Vec::new(),
            models: Vec::new(),
            player: None,
            skybox_vertices,
            skybox: None,
            debug_lines: None,
        }
    }

    fn texture_view(&self, id: Option<TextureId>) -> &wgpu::TextureView {
        id.and_then(|id| self.textures.get(id.0)).map_or(&self.white.view, |t| &t.view)
    }

    fn upload_model(&self, device: &wgpu::Device, model: &Model, kind: ShaderKind) -> GpuModel {
        let stream = model.vertex_stream();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(model.name.as_str()),
            contents: stream.as_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Uniform Buffer"),
            contents: bytemuck::bytes_of(&ModelUniform::from_matrix(model.model_matrix())),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let model_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("model_bind_group"),
            layout: &self.layouts.model,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: uniform_buffer.as_entire_binding() }],
        });
        let [t0, t1, t2] = model.textures.bindings(kind);
        let texture_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("texture_bind_group"),
            layout: &self.layouts.textures,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(self.texture_view(t0)) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(self.texture_view(t1)) },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::TextureView(self.texture_view(t2)) },
                wgpu::BindGroupEntry { binding: 3, resource: wgpu::BindingResource::Sampler(&self.sampler) },
            ],
        });
        GpuModel {
            vertex_buffer,
            vertex_count: stream.len() as u32,
            kind,
            uniform_buffer,
            model_group,
            texture_group,
        }
    }

    /// Uploads every texture in the registry and every model of the scene. Must
    /// run after the scene is loaded and finalized.
    pub async fn upload_scene(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &Scene,
        registry: &TextureRegistry,
    ) -> Result<(), RenderError> {
        validated(device, "scene upload", || self.upload_scene_resources(device, queue, scene, registry)).await
    }

    fn upload_scene_resources(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene, registry: &TextureRegistry) {
        self.textures = registry
            .iter()
            .map(|(id, image)| GpuTexture::from_image(device, queue, image, &format!("Texture {}", id.0)))
            .collect();
        self.models = scene.models.iter().map(|m| self.upload_model(device, m, scene.shader_for(m))).collect();

        self.skybox = scene.skybox.map(|skybox| {
            let faces = skybox.faces.map(|face| face.and_then(|id| registry.get(id)));
            let cube = GpuTexture::cube(device, queue, faces);
            let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("skybox_bind_group"),
                layout: &self.layouts.skybox,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&cube.view) },
                    wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&self.sampler) },
                ],
            });
            (cube, group)
        });
        log::info!(
            "Uploaded {} textures, {} models, skybox: {}",
            self.textures.len(),
            self.models.len(),
            self.skybox.is_some()
        );
    }

    pub async fn upload_player(&mut self, device: &wgpu::Device, player: &Model) -> Result<(), RenderError> {
        let gpu = validated(device, "player upload", || self.upload_model(device, player, player.shader_kind())).await?;
        self.player = Some(gpu);
        Ok(())
    }

    /// Writes this frame's uniforms. With colliders shown, rebuilds the line
    /// buffer from the current boxes.
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene, player: &Model, camera: &Camera) {
        let projection = scene.projection_matrix();
        let camera_uniform = CameraUniform {
            view_proj: (projection * camera.view_matrix()).to_cols_array_2d(),
            skybox_view_proj: (projection * camera.skybox_view()).to_cols_array_2d(),
            view_position: camera.position.extend(1.0).to_array(),
        };
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera_uniform));

        for (gpu, model) in self.models.iter().zip(&scene.models) {
            queue.write_buffer(&gpu.uniform_buffer, 0, bytemuck::bytes_of(&ModelUniform::from_matrix(model.model_matrix())));
        }
        if let Some(gpu) = &self.player {
            queue.write_buffer(&gpu.uniform_buffer, 0, bytemuck::bytes_of(&ModelUniform::from_matrix(player.model_matrix())));
        }

        self.debug_lines = camera.show_colliders.then(|| {
            let lines: Vec<PositionVertex> = scene
                .models
                .iter()
                .chain(std::iter::once(player))
                .flat_map(|m| m.aabb_line_vertices())
                .map(|p| PositionVertex::new(p.to_array()))
                .collect();
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Collider Lines"),
                contents: bytemuck::cast_slice(&lines),
                usage: wgpu::BufferUsages::VERTEX,
            });
            (buffer, lines.len() as u32)
        });
    }

    fn draw_model<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, gpu: &'a GpuModel) {
        if gpu.vertex_count == 0 {
            return;
        }
        pass.set_pipeline(&self.model_pipelines[gpu.kind.index()]);
        pass.set_bind_group(1, &gpu.model_group, &[]);
        pass.set_bind_group(2, &gpu.texture_group, &[]);
        pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
        pass.draw(0..gpu.vertex_count, 0..1);
    }

    pub fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_bind_group(0, &self.frame_group, &[]);

        if let Some((_, group)) = &self.skybox {
            pass.set_pipeline(&self.skybox_pipeline);
            pass.set_bind_group(1, group, &[]);
            pass.set_vertex_buffer(0, self.skybox_vertices.slice(..));
            pass.draw(0..36, 0..1);
        }

        match &self.debug_lines {
            Some((buffer, count)) => {
                if *count > 0 {
                    pass.set_pipeline(&self.line_pipeline);
                    pass.set_vertex_buffer(0, buffer.slice(..));
                    pass.draw(0..*count, 0..1);
                }
            }
            None => {
                for gpu in &self.models {
                    self.draw_model(pass, gpu);
                }
            }
        }

        if let Some(gpu) = &self.player {
            self.draw_model(pass, gpu);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::assets::MAX_TEXTURE_DIMENSION;

    #[test]
    fn registry_limit_matches_device_limit() {
        assert_eq!(MAX_TEXTURE_DIMENSION, wgpu::Limits::default().max_texture_dimension_2d);
    }

    #[test]
    fn every_shader_kind_has_an_entry_point() {
        for kind in ShaderKind::ALL {
            let entry = FRAGMENT_ENTRIES[kind.index()];
            assert!(SCENE_SHADER_SOURCE.contains(&format!("fn {}(", entry)), "{}", entry);
        }
    }
}
