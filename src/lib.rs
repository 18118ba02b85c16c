//! # Umbra
//!
//! **A deferred-shading renderer for textured meshes and dynamic lights, built on wgpu.**
//!
//! A frame fills a G-buffer, shades it with every scene light, draws a proxy
//! for each light, blurs the bright pass into bloom and composites the
//! result (or any intermediate target) to the window. A forward path shares
//! the same parameters and caches for comparison.
//!
//! ## Quick Start
//!
//! ```no_run
//! use umbra::*;
//!
//! # fn demo(gpu: &GpuContext, surface: &wgpu::TextureView) {
//! let mut scene = Scene::new(Catalog::new(gpu));
//! let plane = scene.catalog.add_mesh(gpu, "plane", &MeshData::plane(100.0, 20.0));
//! let stone = scene.catalog.add_material(Material {
//!     name: "stone".into(),
//!     albedo_texture: scene.catalog.white(),
//!     relief: true,
//! });
//! let ground = scene.catalog.add_model("ground", plane, vec![stone]);
//! scene.add_entity(Entity::new(Mat4::IDENTITY, ground, EntityKind::GroundPlane));
//! scene.add_light(Light::point(Vec3::new(0.0, 5.0, 0.0), Vec3::Y));
//!
//! let settings = RenderSettings::default();
//! let mut renderer = Renderer::new(gpu);
//! let camera = Camera::default().matrices(gpu.aspect());
//! renderer.update(gpu, &mut scene, &camera, &settings);
//! renderer.render(gpu, &mut scene, &settings, surface);
//! # }
//! ```
//!
//! ## Layout
//!
//! - **Targets**: [`AttachmentSet`] owns one image per [`AttachmentRole`];
//!   [`RenderTargetGroup`] binds them as the geometry, shading or ping-pong
//!   frame buffer and checks completeness.
//! - **Parameters**: [`UniformStream`] packs global and per-object blocks once
//!   per frame; regions go stale on the next map.
//! - **Pipelines**: every submesh caches one [`VertexArray`] per program.
//! - **Passes**: see [`passes`]; [`Renderer`] orders them per [`PipelineKind`].

mod attachment;
mod bindings;
mod camera;
mod catalog;
pub mod config;
pub mod controls;
mod error;
mod gpu;
mod input;
mod mesh;
mod params;
pub mod passes;
mod program;
mod render_target;
mod renderer;
mod scene;
mod settings;
mod texture;
mod uniform_stream;
mod vertex_array;

pub use attachment::{
    AttachmentAllocator, AttachmentDesc, AttachmentImage, AttachmentLimits, AttachmentRole,
    AttachmentSet, GpuImage, ImageHandle,
};
pub use camera::{Camera, CameraControls, CameraMatrices};
pub use catalog::{Catalog, Material, MaterialId, MeshId, Model, ModelId, TextureId, TextureSet};
pub use config::{ViewerConfig, WindowConfig};
pub use error::{AssetError, ConfigError, FramebufferStatus, GpuError};
pub use gpu::GpuContext;
pub use input::{FrameClock, FrameInput, Input};
pub use mesh::{Mesh, MeshData, Transform, Vertex};
pub use params::{MAX_LIGHTS, write_globals, write_locals};
pub use program::{Program, ProgramDesc, ProgramId, ProgramInput};
pub use render_target::{RenderTargetGroup, RenderTargetKind};
pub use renderer::{Renderer, Stage, frame_stages, frame_targets};
pub use scene::{Entity, EntityKind, Light, LightKind, Scene};
pub use settings::{
    BloomSettings, DisplayTarget, MAX_HEIGHT_SCALE, MAX_RELIEF_LAYERS, PipelineKind,
    ReliefSettings, RenderSettings, TargetOwner, final_texture_to_render,
};
pub use texture::{ProceduralSurface, Texture};
pub use uniform_stream::{FrameRegion, StreamWriter, UniformBuffer, UniformStream};
pub use vertex_array::{VertexArray, VertexArrayCache, VertexBinding};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

// Re-export commonly used winit types for convenience
pub use winit::keyboard::KeyCode;
