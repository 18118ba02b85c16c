//! Asset catalog: meshes, models, materials and textures addressed by typed ids.
//!
//! Ids are only handed out by the catalog that owns the asset, so lookups
//! index directly. Models name one material per submesh of their mesh.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::AssetError;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, MeshData};
use crate::texture::{ProceduralSurface, Texture};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModelId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) usize);

#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,
    pub albedo_texture: TextureId,
    /// Drawn with the active relief texture set instead of `albedo_texture`.
    pub relief: bool,
}

#[derive(Clone, Debug)]
pub struct Model {
    pub name: String,
    pub mesh: MeshId,
    /// One material per submesh, in submesh order.
    pub materials: Vec<MaterialId>,
}

/// Albedo, normal and height maps used together by relief materials.
#[derive(Clone, Debug)]
pub struct TextureSet {
    pub name: String,
    pub albedo: TextureId,
    pub normal: TextureId,
    pub height: TextureId,
}

/// The three textures bound for one material draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaterialTextures {
    pub albedo: TextureId,
    pub normal: TextureId,
    pub height: TextureId,
}

pub struct Catalog {
    meshes: Vec<Mesh>,
    models: Vec<Model>,
    materials: Vec<Material>,
    textures: Vec<Texture>,
    texture_paths: HashMap<PathBuf, TextureId>,
    texture_sets: Vec<TextureSet>,
    white: TextureId,
    flat_normal: TextureId,
}

impl Catalog {
    /// A catalog holding the fallback textures and the procedural texture sets.
    pub fn new(gpu: &GpuContext) -> Self {
        let mut catalog = Self {
            meshes: Vec::new(),
            models: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            texture_paths: HashMap::new(),
            texture_sets: Vec::new(),
            white: TextureId(0),
            flat_normal: TextureId(0),
        };

        catalog.white = catalog.add_texture(Texture::solid(
            gpu,
            [255, 255, 255, 255],
            "White",
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ));
        catalog.flat_normal = catalog.add_texture(Texture::solid(
            gpu,
            [128, 128, 255, 255],
            "Flat Normal",
            wgpu::TextureFormat::Rgba8Unorm,
        ));

        catalog.add_surface(gpu, "bricks", &ProceduralSurface::bricks(256, 11));
        catalog.add_surface(gpu, "tiles", &ProceduralSurface::tiles(256, 4, 5));
        catalog
    }

    fn add_surface(&mut self, gpu: &GpuContext, name: &str, surface: &ProceduralSurface) {
        let size = surface.size;
        let mut upload = |data: &[u8], suffix: &str, format| {
            let label = format!("{name} {suffix}");
            self.add_texture(Texture::from_rgba(gpu, data, size, size, &label, format))
        };
        let albedo = upload(&surface.albedo, "albedo", wgpu::TextureFormat::Rgba8UnormSrgb);
        let normal = upload(&surface.normal, "normal", wgpu::TextureFormat::Rgba8Unorm);
        let height = upload(&surface.height, "height", wgpu::TextureFormat::Rgba8Unorm);
        self.texture_sets.push(TextureSet {
            name: name.to_owned(),
            albedo,
            normal,
            height,
        });
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        self.textures.push(texture);
        TextureId(self.textures.len() - 1)
    }

    /// Loads a colour texture from disk, reusing it if the path was loaded before.
    pub fn load_texture_2d(
        &mut self,
        gpu: &GpuContext,
        path: impl AsRef<Path>,
    ) -> Result<TextureId, AssetError> {
        let path = path.as_ref();
        if let Some(id) = self.texture_paths.get(path) {
            return Ok(*id);
        }
        let texture = Texture::from_file(gpu, path)?;
        log::info!(
            "Loaded texture {} ({}x{})",
            path.display(),
            texture.width,
            texture.height
        );
        let id = self.add_texture(texture);
        self.texture_paths.insert(path.to_path_buf(), id);
        Ok(id)
    }

    /// Like [`load_texture_2d`](Self::load_texture_2d), falling back to white on failure.
    pub fn load_texture_or_white(&mut self, gpu: &GpuContext, path: impl AsRef<Path>) -> TextureId {
        match self.load_texture_2d(gpu, path) {
            Ok(id) => id,
            Err(err) => {
                log::warn!("{err}; using white texture");
                self.white
            }
        }
    }

    pub fn add_mesh(&mut self, gpu: &GpuContext, name: &str, data: &MeshData) -> MeshId {
        self.meshes.push(Mesh::new(gpu, name, data));
        MeshId(self.meshes.len() - 1)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    /// Registers a model.
    ///
    /// # Panics
    ///
    /// Panics if `materials` does not hold one entry per submesh of `mesh`.
    pub fn add_model(&mut self, name: &str, mesh: MeshId, materials: Vec<MaterialId>) -> ModelId {
        let submeshes = self.meshes[mesh.0].submeshes.len();
        assert_eq!(
            materials.len(),
            submeshes,
            "model '{name}' needs one material per submesh"
        );
        self.models.push(Model {
            name: name.to_owned(),
            mesh,
            materials,
        });
        ModelId(self.models.len() - 1)
    }

    pub fn mesh(&self, id: MeshId) -> &Mesh {
        &self.meshes[id.0]
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> &mut Mesh {
        &mut self.meshes[id.0]
    }

    pub fn model(&self, id: ModelId) -> &Model {
        &self.models[id.0]
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id.0]
    }

    pub fn texture(&self, id: TextureId) -> &Texture {
        &self.textures[id.0]
    }

    pub fn white(&self) -> TextureId {
        self.white
    }

    pub fn texture_set_count(&self) -> usize {
        self.texture_sets.len()
    }

    /// The texture set at `index`, wrapping around.
    pub fn texture_set(&self, index: usize) -> &TextureSet {
        &self.texture_sets[index % self.texture_sets.len()]
    }

    /// Textures bound for `material` given the active relief set.
    pub fn material_textures(&self, material: MaterialId, relief_set: usize) -> MaterialTextures {
        let material = self.material(material);
        if material.relief {
            let set = self.texture_set(relief_set);
            MaterialTextures {
                albedo: set.albedo,
                normal: set.normal,
                height: set.height,
            }
        } else {
            MaterialTextures {
                albedo: material.albedo_texture,
                normal: self.flat_normal,
                height: self.white,
            }
        }
    }
}
