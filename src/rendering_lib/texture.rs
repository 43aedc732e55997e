// src/rendering_lib/texture.rs

use crate::engine_lib::assets::ImageData;

pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

const FALLBACK_FACE: [u8; 4] = [128, 128, 128, 255];

impl GpuTexture {
    pub fn from_image(device: &wgpu::Device, queue: &wgpu::Queue, image: &ImageData, label: &str) -> Self {
        let size = wgpu::Extent3d { width: image.width, height: image.height, depth_or_array_layers: 1 };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        write_layers(queue, &texture, &image.rgba, image.width, image.height, size);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// 1x1 white, bound wherever a model has no texture in a slot.
    pub fn white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let image = ImageData { width: 1, height: 1, rgba: vec![255; 4] };
        Self::from_image(device, queue, &image, "White Texture")
    }

    pub fn cube(device: &wgpu::Device, queue: &wgpu::Queue, faces: [Option<&ImageData>; 6]) -> Self {
        let (edge, pixels) = cube_face_pixels(faces);
        let size = wgpu::Extent3d { width: edge, height: edge, depth_or_array_layers: 6 };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Skybox Cube Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        write_layers(queue, &texture, &pixels, edge, edge, size);
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Skybox Cube View"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        Self { texture, view }
    }

    pub fn render_target(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

fn write_layers(queue: &wgpu::Queue, texture: &wgpu::Texture, data: &[u8], width: u32, height: u32, size: wgpu::Extent3d) {
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
}

pub fn linear_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

pub fn clamped_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

/// Packs six faces into one layered buffer of square faces.
///
/// The edge length comes from the first usable face. Faces that are missing or
/// of a different size are filled grey. Registry images are stored bottom-up,
/// cube faces are uploaded top-down, so rows are flipped back here.
pub fn cube_face_pixels(faces: [Option<&ImageData>; 6]) -> (u32, Vec<u8>) {
    let edge = faces
        .iter()
        .flatten()
        .find(|img| img.width == img.height && img.width > 0)
        .map(|img| img.width)
        .unwrap_or(1);
    let row_bytes = 4 * edge as usize;
    let face_bytes = row_bytes * edge as usize;

    let mut out = Vec::with_capacity(face_bytes * 6);
    for (i, face) in faces.iter().enumerate() {
        match face {
            Some(img) if img.width == edge && img.height == edge && img.rgba.len() == face_bytes => {
                for row in img.rgba.chunks_exact(row_bytes).rev() {
                    out.extend_from_slice(row);
                }
            }
            _ => {
                log::warn!("Skybox face {} missing or not {}x{}, filling grey", i, edge, edge);
                for _ in 0..edge * edge {
                    out.extend_from_slice(&FALLBACK_FACE);
                }
            }
        }
    }
    (edge, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(edge: u32, top: [u8; 4], rest: [u8; 4]) -> ImageData {
        // Stored bottom-up, so the last row is the visual top.
        let mut rgba = Vec::new();
        for y in 0..edge {
            for _ in 0..edge {
                rgba.extend_from_slice(if y == edge - 1 { &top } else { &rest });
            }
        }
        ImageData { width: edge, height: edge, rgba }
    }

    #[test]
    fn faces_are_packed_top_down() {
        let face = solid(2, [255, 0, 0, 255], [0, 0, 0, 255]);
        let (edge, pixels) = cube_face_pixels([Some(&face); 6]);
        assert_eq!(edge, 2);
        assert_eq!(pixels.len(), 2 * 2 * 4 * 6);
        assert_eq!(&pixels[0..4], &[255, 0, 0, 255]);
        assert_eq!(&pixels[8..12], &[0, 0, 0, 255]);
    }

    #[test]
    fn missing_and_mismatched_faces_are_grey() {
        let face = solid(2, [1, 2, 3, 4], [1, 2, 3, 4]);
        let odd = solid(4, [9, 9, 9, 9], [9, 9, 9, 9]);
        let (edge, pixels) = cube_face_pixels([None, Some(&face), Some(&odd), Some(&face), Some(&face), Some(&face)]);
        assert_eq!(edge, 2);
        let face_bytes = 2 * 2 * 4;
        assert!(pixels[..face_bytes].chunks(4).all(|p| p == FALLBACK_FACE));
        assert!(pixels[2 * face_bytes..3 * face_bytes].chunks(4).all(|p| p == FALLBACK_FACE));
        assert_eq!(&pixels[face_bytes..face_bytes + 4], &[1, 2, 3, 4]);
    }

    #[test]
    fn no_faces_gives_one_pixel_cube() {
        let (edge, pixels) = cube_face_pixels([None; 6]);
        assert_eq!(edge, 1);
        assert_eq!(pixels.len(), 24);
    }
}
