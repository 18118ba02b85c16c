use std::path::Path;

use crate::error::AssetError;
use crate::gpu::GpuContext;

/// A sampled GPU texture.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Create a texture from raw RGBA data.
    ///
    /// Colour data should use an sRGB format; normal and height maps a
    /// linear one.
    pub fn from_rgba(
        gpu: &GpuContext,
        data: &[u8],
        width: u32,
        height: u32,
        label: &str,
        format: wgpu::TextureFormat,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width,
            height,
        }
    }

    /// A 1x1 texture of one colour.
    pub fn solid(gpu: &GpuContext, rgba: [u8; 4], label: &str, format: wgpu::TextureFormat) -> Self {
        Self::from_rgba(gpu, &rgba, 1, 1, label, format)
    }

    /// Load a colour texture from an image file.
    pub fn from_file(gpu: &GpuContext, path: &Path) -> Result<Self, AssetError> {
        if !path.exists() {
            return Err(AssetError::NotFound(path.to_path_buf()));
        }
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::from_rgba(
            gpu,
            &img,
            width,
            height,
            &path.display().to_string(),
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ))
    }
}

/// Shared sampler for material textures: linear filtering, repeating.
pub fn material_sampler(gpu: &GpuContext) -> wgpu::Sampler {
    gpu.device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Material Sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// RGBA8 pixels of one procedural surface: albedo, tangent-space normal, height.
pub struct ProceduralSurface {
    pub size: u32,
    pub albedo: Vec<u8>,
    pub normal: Vec<u8>,
    pub height: Vec<u8>,
}

impl ProceduralSurface {
    /// Running-bond bricks with recessed mortar.
    pub fn bricks(size: u32, seed: u32) -> Self {
        let brick_w = (size / 4).max(2);
        let brick_h = (size / 8).max(2);
        let mortar = (size / 64).max(1);

        let heights = Self::generate(size, |x, y| {
            let row = y / brick_h;
            let shifted = x + (row % 2) * brick_w / 2;
            let (bx, by) = (shifted % brick_w, y % brick_h);
            if bx < mortar || by < mortar {
                0.0
            } else {
                let brick = hash(shifted / brick_w, row, seed);
                0.8 + (hash(x, y, seed) % 16) as f32 / 100.0 + (brick % 5) as f32 / 100.0
            }
        });
        let albedo = Self::colorize(size, &heights, |x, y, h| {
            if h == 0.0 {
                [150, 145, 135]
            } else {
                let tone = (hash(x / 3, y / 3, seed + 7) % 40) as i32 - 20;
                [
                    (150 + tone).clamp(0, 255) as u8,
                    (60 + tone / 2).clamp(0, 255) as u8,
                    (45 + tone / 3).clamp(0, 255) as u8,
                ]
            }
        });
        Self::assemble(size, heights, albedo)
    }

    /// Checkerboard of rounded tiles.
    pub fn tiles(size: u32, tiles: u32, seed: u32) -> Self {
        let cell = (size / tiles.max(1)).max(1);
        let heights = Self::generate(size, |x, y| {
            let u = (x % cell) as f32 / cell as f32 * 2.0 - 1.0;
            let v = (y % cell) as f32 / cell as f32 * 2.0 - 1.0;
            let edge = u.abs().max(v.abs());
            (1.0 - edge.powi(6)).clamp(0.0, 1.0)
        });
        let albedo = Self::colorize(size, &heights, |x, y, _| {
            let dark = ((x / cell) + (y / cell)) % 2 == 0;
            let grain = (hash(x, y, seed) % 12) as u8;
            if dark {
                [40 + grain, 45 + grain, 60 + grain]
            } else {
                [200 + grain, 195 + grain, 180 + grain]
            }
        });
        Self::assemble(size, heights, albedo)
    }

    fn generate(size: u32, height: impl Fn(u32, u32) -> f32) -> Vec<f32> {
        (0..size * size).map(|i| height(i % size, i / size)).collect()
    }

    fn colorize(size: u32, heights: &[f32], color: impl Fn(u32, u32, f32) -> [u8; 3]) -> Vec<u8> {
        let mut data = Vec::with_capacity(heights.len() * 4);
        for (i, h) in heights.iter().enumerate() {
            let i = i as u32;
            let [r, g, b] = color(i % size, i / size, *h);
            data.extend_from_slice(&[r, g, b, 255]);
        }
        data
    }

    fn assemble(size: u32, heights: Vec<f32>, albedo: Vec<u8>) -> Self {
        let normal = normals_from_heights(size, &heights, 4.0);
        let height = heights
            .iter()
            .flat_map(|h| {
                let v = (h.clamp(0.0, 1.0) * 255.0).round() as u8;
                [v, v, v, 255]
            })
            .collect();
        Self {
            size,
            albedo,
            normal,
            height,
        }
    }
}

/// Tangent-space normals (RGBA8, +Z out of the surface) from a wrapping height field.
pub fn normals_from_heights(size: u32, heights: &[f32], strength: f32) -> Vec<u8> {
    let at = |x: i64, y: i64| {
        let s = size as i64;
        heights[(y.rem_euclid(s) * s + x.rem_euclid(s)) as usize]
    };
    let mut data = Vec::with_capacity(heights.len() * 4);
    for y in 0..size as i64 {
        for x in 0..size as i64 {
            let dx = (at(x + 1, y) - at(x - 1, y)) * strength;
            let dy = (at(x, y + 1) - at(x, y - 1)) * strength;
            let n = glam::Vec3::new(-dx, -dy, 1.0).normalize();
            let encode = |c: f32| ((c * 0.5 + 0.5) * 255.0).round() as u8;
            data.extend_from_slice(&[encode(n.x), encode(n.y), encode(n.z), 255]);
        }
    }
    data
}

fn hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_add(x.wrapping_mul(374761393));
    h = h.wrapping_add(y.wrapping_mul(668265263));
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_heights_give_straight_up_normals() {
        let normals = normals_from_heights(4, &[0.5; 16], 4.0);
        assert_eq!(normals.len(), 64);
        for px in normals.chunks(4) {
            assert_eq!(px, [128, 128, 255, 255]);
        }
    }

    #[test]
    fn surfaces_have_matching_sizes() {
        for surface in [ProceduralSurface::bricks(64, 1), ProceduralSurface::tiles(64, 4, 2)] {
            let bytes = (surface.size * surface.size * 4) as usize;
            assert_eq!(surface.albedo.len(), bytes);
            assert_eq!(surface.normal.len(), bytes);
            assert_eq!(surface.height.len(), bytes);
        }
    }

    #[test]
    fn brick_mortar_is_recessed() {
        let bricks = ProceduralSurface::bricks(64, 3);
        // Pixel (0, 0) lies on a mortar line.
        assert_eq!(bricks.height[0], 0);
        let raised = bricks.height.chunks(4).filter(|px| px[0] > 180).count();
        assert!(raised > bricks.height.len() / 8);
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash(3, 4, 5), hash(3, 4, 5));
        assert_ne!(hash(3, 4, 5), hash(4, 3, 5));
    }
}
