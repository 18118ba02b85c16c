//! Bind group layouts shared by the render passes.
//!
//! | layout     | bound at | contents                                          |
//! |------------|----------|---------------------------------------------------|
//! | `global`   | group 0  | `Globals` uniform block                            |
//! | `local`    | group 1  | `Locals` uniform block, dynamic offset             |
//! | `material` | group 2  | albedo, normal, height textures + sampler          |
//! | `gbuffer`  | group 1  | gPosition, gNormal, gAlbedoSpec, gDepth (unfiltered) |
//! | `blur`     | group 0  | image + sampler + `horizontal` flag               |
//! | `composite`| group 0  | displayed image, bloom image, composite params     |

use std::num::NonZeroU64;

use crate::params::{GLOBAL_BLOCK_SIZE, LOCAL_BLOCK_SIZE};

pub struct Layouts {
    pub global: wgpu::BindGroupLayout,
    pub local: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
    pub gbuffer: wgpu::BindGroupLayout,
    pub blur: wgpu::BindGroupLayout,
    pub composite: wgpu::BindGroupLayout,
}

fn uniform_entry(binding: u32, dynamic: bool, min_size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: NonZeroU64::new(min_size),
        },
        count: None,
    }
}

fn texture_entry(binding: u32, filterable: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
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
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = |label: &str, entries: &[wgpu::BindGroupLayoutEntry]| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries,
            })
        };

        Self {
            global: layout(
                "Global Params Layout",
                &[uniform_entry(0, false, GLOBAL_BLOCK_SIZE)],
            ),
            local: layout(
                "Local Params Layout",
                &[uniform_entry(0, true, LOCAL_BLOCK_SIZE)],
            ),
            material: layout(
                "Material Layout",
                &[
                    texture_entry(0, true),
                    texture_entry(1, true),
                    texture_entry(2, true),
                    sampler_entry(3),
                ],
            ),
            gbuffer: layout(
                "G-Buffer Layout",
                &[
                    texture_entry(0, false),
                    texture_entry(1, false),
                    texture_entry(2, false),
                    texture_entry(3, false),
                ],
            ),
            blur: layout(
                "Blur Layout",
                &[
                    texture_entry(0, true),
                    sampler_entry(1),
                    uniform_entry(2, false, 16),
                ],
            ),
            composite: layout(
                "Composite Layout",
                &[
                    texture_entry(0, false),
                    texture_entry(1, false),
                    uniform_entry(2, false, 16),
                ],
            ),
        }
    }
}

/// Binds `size` bytes of `buffer` from offset 0 at binding 0.
pub fn uniform_bind_group(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    size: u64,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: NonZeroU64::new(size),
            }),
        }],
    })
}

/// Binds texture views at consecutive bindings starting at 0.
pub fn texture_bind_group(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    views: &[&wgpu::TextureView],
    sampler: Option<&wgpu::Sampler>,
    uniform: Option<&wgpu::Buffer>,
) -> wgpu::BindGroup {
    let mut entries: Vec<wgpu::BindGroupEntry<'_>> = views
        .iter()
        .enumerate()
        .map(|(i, view)| wgpu::BindGroupEntry {
            binding: i as u32,
            resource: wgpu::BindingResource::TextureView(view),
        })
        .collect();
    if let Some(sampler) = sampler {
        entries.push(wgpu::BindGroupEntry {
            binding: entries.len() as u32,
            resource: wgpu::BindingResource::Sampler(sampler),
        });
    }
    if let Some(buffer) = uniform {
        entries.push(wgpu::BindGroupEntry {
            binding: entries.len() as u32,
            resource: buffer.as_entire_binding(),
        });
    }
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &entries,
    })
}
