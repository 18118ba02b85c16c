//! Scene contents: entities, lights and the asset catalog they reference.

use glam::{Mat4, Vec3};

use crate::catalog::{Catalog, ModelId};
use crate::uniform_stream::FrameRegion;

/// What an entity is, which decides how its local record is filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Model,
    /// Drawn with relief mapping when it is enabled.
    GroundPlane,
    Sphere,
}

/// An instance of a model placed in the world.
#[derive(Clone, Debug)]
pub struct Entity {
    pub world: Mat4,
    pub model: ModelId,
    pub kind: EntityKind,
    pub(crate) local: Option<FrameRegion>,
}

impl Entity {
    pub fn new(world: Mat4, model: ModelId, kind: EntityKind) -> Self {
        Self {
            world,
            model,
            kind,
            local: None,
        }
    }

    /// The local-parameter region written for this entity, if any.
    pub fn local_region(&self) -> Option<FrameRegion> {
        self.local
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    Point,
    Directional,
}

impl LightKind {
    /// Value of the `kind` field in the shader's light record.
    pub fn code(self) -> u32 {
        match self {
            Self::Point => 0,
            Self::Directional => 1,
        }
    }
}

/// A dynamic light.
///
/// Point lights ignore `direction`. Directional lights ignore `position`
/// when shading but use it to place their proxy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    intensity: u32,
}

impl Light {
    pub const MAX_INTENSITY: u32 = 100;

    pub fn point(position: Vec3, color: Vec3) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            direction: Vec3::new(0.0, -1.0, -1.0),
            color,
            intensity: Self::MAX_INTENSITY,
        }
    }

    pub fn directional(position: Vec3, direction: Vec3, color: Vec3) -> Self {
        Self {
            kind: LightKind::Directional,
            direction,
            ..Self::point(position, color)
        }
    }

    pub fn with_intensity(mut self, intensity: u32) -> Self {
        self.set_intensity(intensity);
        self
    }

    /// Sets the intensity, clamped to `0..=100`.
    pub fn set_intensity(&mut self, intensity: u32) {
        self.intensity = intensity.min(Self::MAX_INTENSITY);
    }

    pub fn intensity(&self) -> u32 {
        self.intensity
    }

    /// Colour scaled by intensity.
    pub fn radiance(&self) -> Vec3 {
        self.color * (self.intensity as f32 / Self::MAX_INTENSITY as f32)
    }

    /// View matrix looking from the light's position along its direction.
    pub fn rotation(&self) -> Mat4 {
        let forward = self.direction.normalize_or(Vec3::NEG_Z);
        let mut right = Vec3::Y.cross(forward);
        if right.length_squared() < 1e-6 {
            right = Vec3::X;
        }
        let up = forward.cross(right.normalize());
        Mat4::look_to_rh(self.position, forward, up)
    }

    /// World matrix of the proxy drawn by the light-volume pass.
    ///
    /// Point lights get a small sphere; directional lights a plane facing
    /// along their direction.
    pub fn proxy_world(&self) -> Mat4 {
        match self.kind {
            LightKind::Point => {
                Mat4::from_translation(self.position) * Mat4::from_scale(Vec3::splat(0.3))
            }
            LightKind::Directional => {
                self.rotation().inverse()
                    * Mat4::from_rotation_x(std::f32::consts::FRAC_PI_2)
                    * Mat4::from_scale(Vec3::splat(0.6))
            }
        }
    }
}

/// Everything the renderer draws in one frame.
pub struct Scene {
    pub entities: Vec<Entity>,
    pub lights: Vec<Light>,
    pub catalog: Catalog,
}

impl Scene {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            entities: Vec::new(),
            lights: Vec::new(),
            catalog,
        }
    }

    pub fn add_entity(&mut self, entity: Entity) -> usize {
        self.entities.push(entity);
        self.entities.len() - 1
    }

    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn intensity_is_clamped() {
        let mut light = Light::point(Vec3::ZERO, Vec3::ONE).with_intensity(250);
        assert_eq!(light.intensity(), 100);
        light.set_intensity(40);
        assert_eq!(light.intensity(), 40);
        assert!(approx(light.radiance(), Vec3::splat(0.4)));
    }

    #[test]
    fn point_light_defaults() {
        let light = Light::point(Vec3::new(0.0, 5.0, 0.0), Vec3::Y);
        assert_eq!(light.kind, LightKind::Point);
        assert_eq!(light.intensity(), 100);
        assert_eq!(light.direction, Vec3::new(0.0, -1.0, -1.0));
    }

    #[test]
    fn rotation_looks_along_direction() {
        let light = Light::directional(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 0.0, -2.0), Vec3::ONE);
        let view = light.rotation();
        assert!(approx(view.transform_point3(light.position), Vec3::ZERO));
        let ahead = light.position + Vec3::NEG_Z;
        assert!(approx(view.transform_point3(ahead), Vec3::NEG_Z));
    }

    #[test]
    fn rotation_handles_vertical_direction() {
        let light = Light::directional(Vec3::ZERO, Vec3::NEG_Y, Vec3::ONE);
        let view = light.rotation();
        assert!(view.is_finite());
        assert!(approx(view.transform_point3(Vec3::NEG_Y), Vec3::NEG_Z));
    }

    #[test]
    fn point_proxy_sits_on_the_light() {
        let light = Light::point(Vec3::new(1.0, 0.0, 1.0), Vec3::Z);
        let center = light.proxy_world().transform_point3(Vec3::ZERO);
        assert!(approx(center, light.position));
    }
}
