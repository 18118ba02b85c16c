//! Render passes of the deferred and forward pipelines.
//!
//! Each pass owns its [`Program`](crate::program::Program) and records into a
//! caller-supplied command encoder. Passes whose program failed to compile
//! log once at construction and record nothing afterwards.
//!
//! Mesh passes (geometry and forward) share [`draw_entities`]: entities are
//! flattened into a [`DrawItem`] list, one item per submesh, and each item is
//! drawn with the pipeline its submesh's vertex array cache holds for the
//! pass's program.

mod bloom;
mod composite;
mod forward;
mod geometry;
mod light_volume;
mod shading;

pub use bloom::{BloomPass, BlurInput, BlurOutcome, BlurStep, blur_image, blur_schedule};
pub use composite::{CompositeParams, CompositePass, composite_params};
pub use forward::ForwardPass;
pub use geometry::GeometryPass;
pub use light_volume::LightVolumePass;
pub use shading::ShadingPass;

use crate::bindings::texture_bind_group;
use crate::catalog::{Catalog, MaterialId, MeshId, Model};
use crate::program::Program;
use crate::scene::Entity;
use crate::uniform_stream::UniformStream;

/// One submesh draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawItem {
    pub entity: usize,
    pub mesh: MeshId,
    pub submesh: usize,
    pub material: MaterialId,
    /// Dynamic offset of the entity's local record.
    pub local_offset: u32,
}

/// Flattens entities into submesh draws.
///
/// Entities whose local record was not written into the current frame of
/// `locals` are skipped with a warning.
pub fn build_draw_list(entities: &[Entity], models: &[Model], locals: &UniformStream) -> Vec<DrawItem> {
    let mut draws = Vec::new();
    for (index, entity) in entities.iter().enumerate() {
        let Some(region) = entity.local_region().filter(|r| locals.is_current(r)) else {
            log::warn!("Entity {index} has no local parameters this frame; skipped");
            continue;
        };
        let model = &models[entity.model.0];
        draws.extend(
            model
                .materials
                .iter()
                .enumerate()
                .map(|(submesh, material)| DrawItem {
                    entity: index,
                    mesh: model.mesh,
                    submesh,
                    material: *material,
                    local_offset: region.offset,
                }),
        );
    }
    draws
}

/// Bind groups shared by every mesh draw of a frame.
pub struct FrameBindings<'a> {
    pub global: &'a wgpu::BindGroup,
    pub local: &'a wgpu::BindGroup,
    pub material_layout: &'a wgpu::BindGroupLayout,
    pub sampler: &'a wgpu::Sampler,
    pub relief_set: usize,
}

/// Draws `draws` with `program` into an already begun pass.
///
/// Groups 0 and 1 hold the global and local parameters; group 2 the
/// material textures of each item.
pub(crate) fn draw_entities(
    device: &wgpu::Device,
    pass: &mut wgpu::RenderPass<'_>,
    program: &Program,
    catalog: &mut Catalog,
    draws: &[DrawItem],
    bindings: &FrameBindings<'_>,
) {
    pass.set_bind_group(0, bindings.global, &[]);

    for item in draws {
        let submesh = &mut catalog.mesh_mut(item.mesh).submeshes[item.submesh];
        let vertex_array = submesh.vertex_arrays.find_or_create(
            program.id(),
            program.inputs(),
            &submesh.layout,
            |binding| program.build_pipeline(device, Some(binding)),
        );

        let textures = catalog.material_textures(item.material, bindings.relief_set);
        let material = texture_bind_group(
            device,
            "Material",
            bindings.material_layout,
            &[
                &catalog.texture(textures.albedo).view,
                &catalog.texture(textures.normal).view,
                &catalog.texture(textures.height).view,
            ],
            Some(bindings.sampler),
            None,
        );

        pass.set_pipeline(&vertex_array.state);
        pass.set_bind_group(1, bindings.local, &[item.local_offset]);
        pass.set_bind_group(2, &material, &[]);
        catalog.mesh(item.mesh).draw_submesh(pass, item.submesh);
    }
}

/// Logs a program that could not be built for `pass`.
pub(crate) fn report_missing(pass: &str, program: &Option<Program>) {
    if program.is_none() {
        log::error!("{pass} pass disabled: its program failed to compile");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelId;
    use crate::scene::EntityKind;
    use crate::settings::MAX_RELIEF_LAYERS;
    use glam::Mat4;

    fn models() -> Vec<Model> {
        vec![
            Model {
                name: "plane".into(),
                mesh: MeshId(0),
                materials: vec![MaterialId(0)],
            },
            Model {
                name: "totem".into(),
                mesh: MeshId(1),
                materials: vec![MaterialId(1), MaterialId(2)],
            },
        ]
    }

    #[test]
    fn mesh_programs_share_relief_march() {
        let bound = format!("i < {}", MAX_RELIEF_LAYERS as u32);
        for (name, source) in [
            ("geometry", include_str!("../shaders/geometry.wgsl")),
            ("forward", include_str!("../shaders/forward.wgsl")),
        ] {
            assert!(source.contains(&bound), "{name} march loop");
            assert!(source.contains("textureSampleLevel(height_texture"), "{name} height reads");
            assert!(
                source.contains("uv = relief_uv(uv"),
                "{name} applies relief to material lookups"
            );
        }
    }

    #[test]
    fn one_draw_per_submesh() {
        let mut entities = vec![
            Entity::new(Mat4::IDENTITY, ModelId(0), EntityKind::GroundPlane),
            Entity::new(Mat4::IDENTITY, ModelId(1), EntityKind::Model),
        ];
        let mut locals = UniformStream::new(1024);
        {
            let mut w = locals.map();
            for entity in &mut entities {
                w.align_head(256);
                let start = w.head();
                w.push_u32(1);
                entity.local = Some(w.region_since(start));
            }
        }

        let draws = build_draw_list(&entities, &models(), &locals);
        assert_eq!(draws.len(), 3);
        assert_eq!(draws[0].local_offset, 0);
        assert_eq!(
            draws[2],
            DrawItem {
                entity: 1,
                mesh: MeshId(1),
                submesh: 1,
                material: MaterialId(2),
                local_offset: 256,
            }
        );
    }

    #[test]
    fn stale_and_missing_regions_are_skipped() {
        let mut entities = vec![
            Entity::new(Mat4::IDENTITY, ModelId(0), EntityKind::GroundPlane),
            Entity::new(Mat4::IDENTITY, ModelId(1), EntityKind::Model),
        ];
        let mut locals = UniformStream::new(1024);
        {
            let mut w = locals.map();
            let start = w.head();
            w.push_u32(1);
            entities[0].local = Some(w.region_since(start));
        }
        assert_eq!(build_draw_list(&entities, &models(), &locals).len(), 1);

        drop(locals.map());
        assert!(build_draw_list(&entities, &models(), &locals).is_empty());
    }
}
