// src/rendering_lib/post_process.rs

//! HDR capture and bloom.
//!
//! A frame goes through three phases in order: capture (the scene is drawn into
//! the HDR target by `begin_render`), extract + blur, combine into the output.
//! With bloom disabled `resolve` runs only the combine step at zero strength.

use wgpu::util::DeviceExt;

use super::error::{validated, RenderError};
use super::shader::POST_SHADER_SOURCE;
use super::texture::{clamped_sampler, GpuTexture};
use super::vertex::{BloomParams, QuadVertex, FULLSCREEN_QUAD};

pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;
pub const BLUR_PASSES: usize = 10;

/// One full-screen pass of the bloom chain. Indices name ping-pong targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BloomPass {
    /// Capture → ping-pong `target`, keeping only bright pixels.
    Extract { target: usize },
    Blur { source: usize, target: usize, horizontal: bool },
    /// Capture + ping-pong `bloom` → output.
    Combine { bloom: usize },
}

/// Extract into 0, then `blur_passes` alternating blurs, then combine with the last one written.
pub fn bloom_schedule(blur_passes: usize) -> Vec<BloomPass> {
    let mut passes = Vec::with_capacity(blur_passes + 2);
    passes.push(BloomPass::Extract { target: 0 });
    for i in 0..blur_passes {
        passes.push(BloomPass::Blur { source: i % 2, target: (i + 1) % 2, horizontal: i % 2 == 0 });
    }
    passes.push(BloomPass::Combine { bloom: blur_passes % 2 });
    passes
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    /// The HDR target holds this frame's scene.
    Fresh,
    /// Nothing was captured since the last apply; the previous contents were used.
    Stale,
}

#[derive(Debug, Default)]
pub struct CaptureTracker {
    captured: bool,
}

impl CaptureTracker {
    pub fn mark_captured(&mut self) {
        self.captured = true;
    }

    pub fn consume(&mut self) -> CaptureState {
        let state = if self.captured { CaptureState::Fresh } else { CaptureState::Stale };
        self.captured = false;
        state
    }
}

fn blur_slot(source: usize, horizontal: bool) -> usize {
    source * 2 + usize::from(!horizontal)
}

struct Targets {
    hdr: GpuTexture,
    depth: GpuTexture,
    ping_pong: [GpuTexture; 2],
    extract_group: wgpu::BindGroup,
    blur_groups: [wgpu::BindGroup; 4],
    combine_groups: [wgpu::BindGroup; 2],
}

/// Size-independent GPU objects.
struct Passes {
    quad: wgpu::Buffer,
    sampler: wgpu::Sampler,
    single_layout: wgpu::BindGroupLayout,
    combine_layout: wgpu::BindGroupLayout,
    extract_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    combine_pipeline: wgpu::RenderPipeline,
    params: wgpu::Buffer,
    blur_params: [wgpu::Buffer; 2],
}

pub struct PostProcess {
    width: u32,
    height: u32,
    passes: Passes,
    targets: Targets,
    capture: CaptureTracker,
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

fn post_layout(device: &wgpu::Device, with_bloom: bool, label: &str) -> wgpu::BindGroupLayout {
    let mut entries = vec![
        texture_entry(0),
        wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        },
    ];
    if with_bloom {
        entries.push(texture_entry(3));
    }
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor { label: Some(label), entries: &entries })
}

impl Passes {
    fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Post Process Shader"),
            source: wgpu::ShaderSource::Wgsl(POST_SHADER_SOURCE.into()),
        });
        let single_layout = post_layout(device, false, "post_single_layout");
        let combine_layout = post_layout(device, true, "post_combine_layout");

        let pipeline = |layout: &wgpu::BindGroupLayout, entry: &str, format: wgpu::TextureFormat, label: &str| {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: "vs_quad",
                    buffers: &[QuadVertex::desc()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: entry,
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            })
        };
        let extract_pipeline = pipeline(&single_layout, "fs_extract", HDR_FORMAT, "Bloom Extract Pipeline");
        let blur_pipeline = pipeline(&single_layout, "fs_blur", HDR_FORMAT, "Bloom Blur Pipeline");
        let combine_pipeline = pipeline(&combine_layout, "fs_combine", output_format, "Bloom Combine Pipeline");

        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fullscreen Quad"),
            contents: bytemuck::cast_slice(&FULLSCREEN_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Bloom Params"),
            contents: bytemuck::bytes_of(&BloomParams::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let blur_params = [[1.0f32, 0.0], [0.0, 1.0]].map(|direction| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Blur Params"),
                contents: bytemuck::bytes_of(&BloomParams { direction, ..Default::default() }),
                usage: wgpu::BufferUsages::UNIFORM,
            })
        });

        Self {
            quad,
            sampler: clamped_sampler(device, "Post Process Sampler"),
            single_layout,
            combine_layout,
            extract_pipeline,
            blur_pipeline,
            combine_pipeline,
            params,
            blur_params,
        }
    }

    fn single_group(&self, device: &wgpu::Device, source: &wgpu::TextureView, params: &wgpu::Buffer) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("post_single_group"),
            layout: &self.single_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(source) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&self.sampler) },
                wgpu::BindGroupEntry { binding: 2, resource: params.as_entire_binding() },
            ],
        })
    }
}

impl Targets {
    fn new(device: &wgpu::Device, passes: &Passes, width: u32, height: u32) -> Self {
        let hdr = GpuTexture::render_target(device, HDR_FORMAT, width, height, "HDR Capture");
        let depth = GpuTexture::render_target(device, DEPTH_FORMAT, width, height, "HDR Depth Stencil");
        let ping_pong = [
            GpuTexture::render_target(device, HDR_FORMAT, width, height, "Ping Pong 0"),
            GpuTexture::render_target(device, HDR_FORMAT, width, height, "Ping Pong 1"),
        ];

        let extract_group = passes.single_group(device, &hdr.view, &passes.params);
        let blur_groups = [(0, true), (0, false), (1, true), (1, false)].map(|(source, horizontal)| {
            let params = &passes.blur_params[usize::from(!horizontal)];
            passes.single_group(device, &ping_pong[source].view, params)
        });
        let combine_groups = [0, 1].map(|i| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("post_combine_group"),
                layout: &passes.combine_layout,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&hdr.view) },
                    wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&passes.sampler) },
                    wgpu::BindGroupEntry { binding: 2, resource: passes.params.as_entire_binding() },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&ping_pong[i].view),
                    },
                ],
            })
        });

        Self { hdr, depth, ping_pong, extract_group, blur_groups, combine_groups }
    }
}

impl PostProcess {
    /// Builds pipelines and size-dependent targets. Any validation error is fatal.
    pub async fn new(
        device: &wgpu::Device,
        output_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let (width, height) = (width.max(1), height.max(1));
        let post = validated(device, "bloom pipeline", || {
            let passes = Passes::new(device, output_format);
            let targets = Targets::new(device, &passes, width, height);
            Self { width, height, passes, targets, capture: CaptureTracker::default() }
        })
        .await?;
        log::info!("Bloom targets ready at {}x{}", width, height);
        Ok(post)
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.targets = Targets::new(device, &self.passes, width, height);
        log::debug!("Bloom targets resized to {}x{}", width, height);
    }

    /// Starts the capture pass. Everything drawn into it lands in the HDR target.
    pub fn begin_render<'a>(&'a mut self, encoder: &'a mut wgpu::CommandEncoder) -> wgpu::RenderPass<'a> {
        self.capture.mark_captured();
        let targets = &self.targets;
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("HDR Capture Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &targets.hdr.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r: 0.1, g: 0.1, b: 0.1, a: 1.0 }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &targets.depth.view,
                depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(1.0), store: wgpu::StoreOp::Store }),
                stencil_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(0), store: wgpu::StoreOp::Store }),
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        })
    }

    pub fn apply_bloom(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        output: &wgpu::TextureView,
        threshold: f32,
        strength: f32,
    ) -> CaptureState {
        let state = self.take_capture_state();
        let params = BloomParams { threshold, strength, direction: [0.0; 2] };
        queue.write_buffer(&self.passes.params, 0, bytemuck::bytes_of(&params));
        for pass in bloom_schedule(BLUR_PASSES) {
            self.run_pass(encoder, pass, output);
        }
        state
    }

    /// Bloom off: the capture goes straight to the output through the tone-mapping combine.
    pub fn resolve(&mut self, queue: &wgpu::Queue, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) -> CaptureState {
        let state = self.take_capture_state();
        queue.write_buffer(&self.passes.params, 0, bytemuck::bytes_of(&BloomParams::default()));
        self.run_pass(encoder, BloomPass::Combine { bloom: 0 }, output);
        state
    }

    fn take_capture_state(&mut self) -> CaptureState {
        let state = self.capture.consume();
        if state == CaptureState::Stale {
            log::warn!("Post-process applied without a capture pass; using the previous frame");
        }
        state
    }

    fn run_pass(&self, encoder: &mut wgpu::CommandEncoder, pass: BloomPass, output: &wgpu::TextureView) {
        let (p, t) = (&self.passes, &self.targets);
        let (target, pipeline, group, label) = match pass {
            BloomPass::Extract { target } => {
                (&t.ping_pong[target].view, &p.extract_pipeline, &t.extract_group, "Bloom Extract Pass")
            }
            BloomPass::Blur { source, target, horizontal } => (
                &t.ping_pong[target].view,
                &p.blur_pipeline,
                &t.blur_groups[blur_slot(source, horizontal)],
                "Bloom Blur Pass",
            ),
            BloomPass::Combine { bloom } => (output, &p.combine_pipeline, &t.combine_groups[bloom], "Bloom Combine Pass"),
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations { load: wgpu::LoadOp::Clear(wgpu::Color::BLACK), store: wgpu::StoreOp::Store },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, group, &[]);
        render_pass.set_vertex_buffer(0, p.quad.slice(..));
        render_pass.draw(0..FULLSCREEN_QUAD.len() as u32, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_has_extract_ten_blurs_and_combine() {
        let passes = bloom_schedule(BLUR_PASSES);
        assert_eq!(passes.len(), BLUR_PASSES + 2);
        assert_eq!(passes[0], BloomPass::Extract { target: 0 });
        assert!(matches!(passes.last(), Some(BloomPass::Combine { .. })));
        assert_eq!(passes.iter().filter(|p| matches!(p, BloomPass::Blur { .. })).count(), 10);
    }

    #[test]
    fn blurs_ping_pong_and_alternate_direction() {
        let passes = bloom_schedule(BLUR_PASSES);
        let mut last_written = 0;
        let mut last_horizontal = None;
        for pass in &passes[1..=BLUR_PASSES] {
            let BloomPass::Blur { source, target, horizontal } = *pass else {
                panic!("expected blur, got {:?}", pass);
            };
            assert_eq!(source, last_written);
            assert_ne!(source, target);
            assert_ne!(Some(horizontal), last_horizontal);
            last_written = target;
            last_horizontal = Some(horizontal);
        }
        assert_eq!(passes[BLUR_PASSES + 1], BloomPass::Combine { bloom: last_written });
    }

    #[test]
    fn zero_blurs_combines_the_extract() {
        assert_eq!(
            bloom_schedule(0),
            vec![BloomPass::Extract { target: 0 }, BloomPass::Combine { bloom: 0 }]
        );
    }

    #[test]
    fn apply_without_capture_is_stale() {
        let mut tracker = CaptureTracker::default();
        assert_eq!(tracker.consume(), CaptureState::Stale);
        tracker.mark_captured();
        assert_eq!(tracker.consume(), CaptureState::Fresh);
        assert_eq!(tracker.consume(), CaptureState::Stale);
    }

    #[test]
    fn blur_slots_are_distinct() {
        let mut slots: Vec<usize> = [(0, true), (0, false), (1, true), (1, false)]
            .iter()
            .map(|(s, h)| blur_slot(*s, *h))
            .collect();
        slots.sort();
        assert_eq!(slots, vec![0, 1, 2, 3]);
    }
}
