//! Packing of global and local shader parameters into uniform streams.
//!
//! Global block (group 0), matching `Globals` in the shaders:
//!
//! | offset | field                 |
//! |--------|-----------------------|
//! | 0      | camera position vec3  |
//! | 12     | light count u32       |
//! | 16     | bright threshold f32  |
//! | 20     | using bloom u32       |
//! | 24     | relief enabled u32    |
//! | 28     | relief height scale   |
//! | 32     | relief min layers     |
//! | 36     | relief max layers     |
//! | 48     | lights, 48 bytes each |
//!
//! Each light record is `color vec3, kind u32, position vec3, intensity u32,
//! direction vec3`, starting on a 16-byte boundary.
//!
//! Local records (group 1, dynamic offset) are `world mat4, world_view_proj
//! mat4, tint vec3, relief u32`, each starting on the device's uniform offset
//! alignment. Entities come first, then one record per light proxy.

use glam::{Mat4, Vec3};

use crate::camera::CameraMatrices;
use crate::scene::{Entity, EntityKind, Light};
use crate::settings::RenderSettings;
use crate::uniform_stream::{FrameRegion, StreamWriter};

/// Lights beyond this count are not shaded.
pub const MAX_LIGHTS: usize = 16;
pub const GLOBAL_HEADER_SIZE: u64 = 48;
pub const LIGHT_RECORD_SIZE: u64 = 48;
/// Size of the `Globals` shader struct.
pub const GLOBAL_BLOCK_SIZE: u64 = GLOBAL_HEADER_SIZE + LIGHT_RECORD_SIZE * MAX_LIGHTS as u64;
/// Size of the `Locals` shader struct.
pub const LOCAL_BLOCK_SIZE: u64 = 144;

/// Writes the global block. Returns its region.
pub fn write_globals(
    w: &mut StreamWriter<'_>,
    camera: &CameraMatrices,
    lights: &[Light],
    settings: &RenderSettings,
) -> FrameRegion {
    if lights.len() > MAX_LIGHTS {
        log::warn!(
            "{} lights in scene, only the first {MAX_LIGHTS} are shaded",
            lights.len()
        );
    }
    let lights = &lights[..lights.len().min(MAX_LIGHTS)];

    let start = w.head();
    w.push_vec3(camera.position);
    w.push_u32(lights.len() as u32);
    w.push_f32(settings.bloom.threshold);
    w.push_u32(settings.bloom.enabled as u32);
    let relief = settings.relief.sanitized();
    w.push_u32(relief.enabled as u32);
    w.push_f32(relief.height_scale);
    w.push_f32(relief.min_layers);
    w.push_f32(relief.max_layers);

    for light in lights {
        w.align_head(16);
        w.push_vec3(light.color);
        w.push_u32(light.kind.code());
        w.push_vec3(light.position);
        w.push_u32(light.intensity());
        w.push_vec3(light.direction);
    }
    w.align_head(16);

    w.region_since(start)
}

fn write_local(
    w: &mut StreamWriter<'_>,
    alignment: usize,
    world: &Mat4,
    view_projection: &Mat4,
    tint: Vec3,
    relief: bool,
) -> FrameRegion {
    w.align_head(alignment);
    let start = w.head();
    w.push_mat4(world);
    w.push_mat4(&(*view_projection * *world));
    w.push_vec3(tint);
    w.push_u32(relief as u32);
    w.align_head(16);
    w.region_since(start)
}

/// Writes one local record per entity, then one per light proxy.
///
/// Each entity's region is stored on the entity; the light proxy regions are
/// returned in light order.
pub fn write_locals(
    w: &mut StreamWriter<'_>,
    alignment: usize,
    view_projection: &Mat4,
    entities: &mut [Entity],
    lights: &[Light],
) -> Vec<FrameRegion> {
    for entity in entities.iter_mut() {
        let relief = entity.kind == EntityKind::GroundPlane;
        entity.local = Some(write_local(
            w,
            alignment,
            &entity.world,
            view_projection,
            Vec3::ONE,
            relief,
        ));
    }

    lights
        .iter()
        .map(|light| {
            write_local(
                w,
                alignment,
                &light.proxy_world(),
                view_projection,
                light.radiance(),
                false,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::catalog::ModelId;
    use crate::settings::MAX_RELIEF_LAYERS;
    use crate::uniform_stream::UniformStream;

    fn u32_at(stream: &UniformStream, offset: usize) -> u32 {
        bytemuck::pod_read_unaligned(&stream.written()[offset..offset + 4])
    }

    fn f32_at(stream: &UniformStream, offset: usize) -> f32 {
        bytemuck::pod_read_unaligned(&stream.written()[offset..offset + 4])
    }

    fn vec3_at(stream: &UniformStream, offset: usize) -> Vec3 {
        Vec3::new(
            f32_at(stream, offset),
            f32_at(stream, offset + 4),
            f32_at(stream, offset + 8),
        )
    }

    #[test]
    fn block_sizes_match_shader_structs() {
        assert_eq!(GLOBAL_BLOCK_SIZE, 816);
        assert_eq!(LOCAL_BLOCK_SIZE, 144);
    }

    #[test]
    fn globals_pack_header_and_lights() {
        let camera = Camera::new(Vec3::new(1.0, 2.0, 3.0), -90.0, 0.0).matrices(1.0);
        let lights = [
            Light::point(Vec3::new(0.0, 5.0, 0.0), Vec3::Y),
            Light::directional(Vec3::ZERO, Vec3::NEG_Y, Vec3::Z).with_intensity(30),
        ];
        let settings = RenderSettings::default();

        let mut stream = UniformStream::new(4096);
        let region = write_globals(&mut stream.map(), &camera, &lights, &settings);

        assert_eq!(region.offset, 0);
        assert_eq!(region.size as u64, GLOBAL_HEADER_SIZE + 2 * LIGHT_RECORD_SIZE);
        assert_eq!(vec3_at(&stream, 0), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(u32_at(&stream, 12), 2);
        assert_eq!(f32_at(&stream, 16), settings.bloom.threshold);
        assert_eq!(u32_at(&stream, 20), 1);

        // First light.
        assert_eq!(vec3_at(&stream, 48), Vec3::Y);
        assert_eq!(u32_at(&stream, 60), 0);
        assert_eq!(vec3_at(&stream, 64), Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(u32_at(&stream, 76), 100);
        // Second light starts on the next 16-byte boundary.
        assert_eq!(vec3_at(&stream, 96), Vec3::Z);
        assert_eq!(u32_at(&stream, 108), 1);
        assert_eq!(u32_at(&stream, 124), 30);
        assert_eq!(vec3_at(&stream, 128), Vec3::NEG_Y);
    }

    #[test]
    fn uploaded_relief_layers_stay_within_march_bound() {
        let camera = Camera::default().matrices(1.0);
        let mut settings = RenderSettings::default();
        settings.relief.min_layers = 0.0;
        settings.relief.max_layers = 200.0;

        let mut stream = UniformStream::new(4096);
        write_globals(&mut stream.map(), &camera, &[], &settings);
        assert_eq!(f32_at(&stream, 32), 1.0);
        assert_eq!(f32_at(&stream, 36), MAX_RELIEF_LAYERS);
    }

    #[test]
    fn extra_lights_are_dropped() {
        let camera = Camera::default().matrices(1.0);
        let lights = vec![Light::point(Vec3::ZERO, Vec3::ONE); MAX_LIGHTS + 3];
        let mut stream = UniformStream::new(4096);
        let region = write_globals(&mut stream.map(), &camera, &lights, &RenderSettings::default());
        assert_eq!(u32_at(&stream, 12), MAX_LIGHTS as u32);
        assert_eq!(region.size as u64, GLOBAL_BLOCK_SIZE);
    }

    #[test]
    fn plane_and_point_light_scenario() {
        let camera = Camera::default().matrices(1.0);
        let vp = camera.view_projection();
        let ground = Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0))
            * Mat4::from_scale(Vec3::new(100.0, 1.0, 100.0))
            * Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2);
        let mut entities = vec![Entity::new(
            ground,
            ModelId(0),
            EntityKind::GroundPlane,
        )];
        let lights = [Light::point(Vec3::new(0.0, 5.0, 0.0), Vec3::Y)];

        let mut local = UniformStream::new(4096);
        let proxies = {
            let mut w = local.map();
            write_locals(&mut w, 256, &vp, &mut entities, &lights)
        };

        let plane = entities[0].local_region().expect("entity region");
        assert_eq!((plane.offset, plane.size as u64), (0, LOCAL_BLOCK_SIZE));
        assert!(local.is_current(&plane));
        assert_eq!(u32_at(&local, 140), 1);
        assert_eq!(f32_at(&local, 52), -1.0);

        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0].offset, 256);
        assert_eq!(vec3_at(&local, 256 + 128), Vec3::Y);
        assert_eq!(u32_at(&local, 256 + 140), 0);

        // The next frame's map makes both regions stale.
        drop(local.map());
        assert!(!local.is_current(&plane));
        assert!(!local.is_current(&proxies[0]));
    }
}
