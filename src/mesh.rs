//! Mesh geometry: vertex format, CPU-side mesh data and GPU meshes.
//!
//! - [`Vertex`] is the vertex format of every built-in mesh
//! - [`MeshData`] holds vertices, indices and submesh ranges on the CPU
//! - [`Mesh`] uploads a [`MeshData`] into one shared vertex buffer and one
//!   shared index buffer; each [`Submesh`] addresses a byte range of both
//! - [`Transform`] places meshes in the world
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//! | uv        | Float32x2 | 24     | 2               |
//! | tangent   | Float32x3 | 32     | 3               |
//!
//! Programs declare which of these they read; the link happens per submesh
//! in its [`VertexArrayCache`].

use glam::{Mat3, Mat4, Quat, Vec3};

use crate::gpu::GpuContext;
use crate::vertex_array::VertexArrayCache;

/// A mesh vertex with position, normal, texture coordinates and tangent.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    /// Direction of increasing `u` in model space.
    pub tangent: [f32; 3],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2], tangent: [f32; 3]) -> Self {
        Self {
            position,
            normal,
            uv,
            tangent,
        }
    }

    /// The attribute layout of [`Vertex`].
    pub fn layout() -> VertexLayout {
        VertexLayout {
            stride: std::mem::size_of::<Vertex>() as u64,
            attributes: vec![
                VertexAttribute {
                    location: 0,
                    components: 3,
                    offset: 0,
                },
                VertexAttribute {
                    location: 1,
                    components: 3,
                    offset: 12,
                },
                VertexAttribute {
                    location: 2,
                    components: 2,
                    offset: 24,
                },
                VertexAttribute {
                    location: 3,
                    components: 3,
                    offset: 32,
                },
            ],
        }
    }
}

/// One float attribute inside a vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: u32,
    pub offset: u64,
}

/// The attributes present in a submesh's vertex data and their stride.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: Vec<VertexAttribute>,
}

/// Vertex and index range of one submesh inside [`MeshData`].
///
/// Indices are relative to `first_vertex`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmeshRange {
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub first_index: u32,
    pub index_count: u32,
}

/// CPU-side mesh geometry, split into submeshes.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub submeshes: Vec<SubmeshRange>,
}

impl MeshData {
    /// Geometry with a single submesh spanning all of it.
    pub fn single(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        let submeshes = vec![SubmeshRange {
            first_vertex: 0,
            vertex_count: vertices.len() as u32,
            first_index: 0,
            index_count: indices.len() as u32,
        }];
        Self {
            vertices,
            indices,
            submeshes,
        }
    }

    /// Concatenates parts; every submesh of every part is kept in order.
    pub fn merge(parts: impl IntoIterator<Item = MeshData>) -> Self {
        let mut merged = MeshData::default();
        for part in parts {
            let vertex_base = merged.vertices.len() as u32;
            let index_base = merged.indices.len() as u32;
            merged
                .submeshes
                .extend(part.submeshes.iter().map(|range| SubmeshRange {
                    first_vertex: range.first_vertex + vertex_base,
                    first_index: range.first_index + index_base,
                    ..*range
                }));
            merged.vertices.extend(part.vertices);
            merged.indices.extend(part.indices);
        }
        merged
    }

    /// Applies `matrix` to positions and its normal matrix to normals and tangents.
    pub fn transformed(mut self, matrix: Mat4) -> Self {
        let normal_matrix = Mat3::from_mat4(matrix).inverse().transpose();
        let tangent_matrix = Mat3::from_mat4(matrix);
        for v in &mut self.vertices {
            v.position = matrix.transform_point3(Vec3::from(v.position)).to_array();
            v.normal = (normal_matrix * Vec3::from(v.normal))
                .normalize_or_zero()
                .to_array();
            v.tangent = (tangent_matrix * Vec3::from(v.tangent))
                .normalize_or_zero()
                .to_array();
        }
        self
    }

    /// A square plane on the XZ axis facing +Y, with UVs repeating `uv_repeat` times.
    pub fn plane(size: f32, uv_repeat: f32) -> Self {
        let half = size * 0.5;
        let n = [0.0, 1.0, 0.0];
        let t = [1.0, 0.0, 0.0];
        let r = uv_repeat;
        let vertices = vec![
            Vertex::new([-half, 0.0, -half], n, [0.0, 0.0], t),
            Vertex::new([-half, 0.0, half], n, [0.0, r], t),
            Vertex::new([half, 0.0, half], n, [r, r], t),
            Vertex::new([half, 0.0, -half], n, [r, 0.0], t),
        ];
        Self::single(vertices, vec![0, 1, 2, 2, 3, 0])
    }

    /// A unit quad in the XY plane facing +Z.
    pub fn quad(uv_repeat: f32) -> Self {
        let n = [0.0, 0.0, 1.0];
        let t = [1.0, 0.0, 0.0];
        let r = uv_repeat;
        let vertices = vec![
            Vertex::new([-0.5, -0.5, 0.0], n, [0.0, r], t),
            Vertex::new([0.5, -0.5, 0.0], n, [r, r], t),
            Vertex::new([0.5, 0.5, 0.0], n, [r, 0.0], t),
            Vertex::new([-0.5, 0.5, 0.0], n, [0.0, 0.0], t),
        ];
        Self::single(vertices, vec![0, 1, 2, 2, 3, 0])
    }

    /// A unit cube centered at the origin, four vertices per face.
    pub fn cube() -> Self {
        // (normal, tangent, bitangent) per face; corners are n/2 +- t/2 +- b/2.
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (face, (n, t, b)) in FACES.iter().enumerate() {
            let (n, t, b) = (Vec3::from(*n), Vec3::from(*t), Vec3::from(*b));
            for (u, v) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                let p = (n + t * (u * 2.0 - 1.0) + b * (v * 2.0 - 1.0)) * 0.5;
                vertices.push(Vertex::new(
                    p.to_array(),
                    n.to_array(),
                    [u, 1.0 - v],
                    t.to_array(),
                ));
            }
            let base = face as u32 * 4;
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        Self::single(vertices, indices)
    }

    /// A UV sphere of radius 0.5.
    pub fn sphere(segments: u32, rings: u32) -> Self {
        let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
        let mut indices = Vec::with_capacity((segments * rings * 6) as usize);

        for ring in 0..=rings {
            let phi = std::f32::consts::PI * ring as f32 / rings as f32;
            let (ring_radius, y) = phi.sin_cos();

            for seg in 0..=segments {
                let theta = std::f32::consts::TAU * seg as f32 / segments as f32;
                let (sin_t, cos_t) = theta.sin_cos();
                let normal = [ring_radius * cos_t, y, ring_radius * sin_t];
                vertices.push(Vertex::new(
                    [normal[0] * 0.5, normal[1] * 0.5, normal[2] * 0.5],
                    normal,
                    [seg as f32 / segments as f32, ring as f32 / rings as f32],
                    [-sin_t, 0.0, cos_t],
                ));
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let current = ring * (segments + 1) + seg;
                let next = current + segments + 1;
                indices.extend_from_slice(&[current, current + 1, next]);
                indices.extend_from_slice(&[current + 1, next + 1, next]);
            }
        }

        Self::single(vertices, indices)
    }

    /// A two-part model: a stone block with a sphere resting on top.
    pub fn totem() -> Self {
        let base = Self::cube().transformed(Mat4::from_scale(Vec3::new(1.0, 1.5, 1.0)));
        let head = Self::sphere(32, 16).transformed(Mat4::from_translation(Vec3::Y * 1.25));
        Self::merge([base, head])
    }
}

/// A submesh: a byte range of its mesh's buffers plus its vertex arrays.
#[derive(Debug)]
pub struct Submesh {
    pub vertex_offset: u64,
    pub index_offset: u64,
    pub index_count: u32,
    pub layout: VertexLayout,
    pub vertex_arrays: VertexArrayCache<wgpu::RenderPipeline>,
}

impl Submesh {
    fn first_index(&self) -> u32 {
        (self.index_offset / std::mem::size_of::<u32>() as u64) as u32
    }
}

/// GPU-resident mesh: shared vertex and index buffers split into submeshes.
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    pub submeshes: Vec<Submesh>,
}

impl Mesh {
    pub fn new(gpu: &GpuContext, name: &str, data: &MeshData) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{name} Vertices")),
                contents: bytemuck::cast_slice(&data.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{name} Indices")),
                contents: bytemuck::cast_slice(&data.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        let layout = Vertex::layout();
        let submeshes = data
            .submeshes
            .iter()
            .map(|range| Submesh {
                vertex_offset: range.first_vertex as u64 * layout.stride,
                index_offset: range.first_index as u64 * std::mem::size_of::<u32>() as u64,
                index_count: range.index_count,
                layout: layout.clone(),
                vertex_arrays: VertexArrayCache::new(),
            })
            .collect();

        log::debug!(
            "Uploaded mesh '{name}': {} vertices, {} indices, {} submeshes",
            data.vertices.len(),
            data.indices.len(),
            data.submeshes.len()
        );

        Self {
            name: name.to_owned(),
            vertex_buffer,
            index_buffer,
            submeshes,
        }
    }

    /// Binds the buffers of submesh `index` and issues its indexed draw.
    ///
    /// The pipeline and bind groups must already be set on `pass`.
    pub fn draw_submesh(&self, pass: &mut wgpu::RenderPass<'_>, index: usize) {
        let submesh = &self.submeshes[index];
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(submesh.vertex_offset..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        let first = submesh.first_index();
        pass.draw_indexed(first..first + submesh.index_count, 0, 0..1);
    }
}

/// Position, rotation and scale of an object, combined in SRT order.
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}
