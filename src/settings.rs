//! Runtime render settings exposed to the debug controls and the config file.

use serde::{Deserialize, Serialize};

use crate::attachment::AttachmentRole;

/// Which rendering path draws the scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Forward,
    #[default]
    Deferred,
}

/// The image presented on screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayTarget {
    #[default]
    Final,
    GPosition,
    GNormals,
    GAlbedo,
    Depth,
    Bright,
    Blurred,
}

impl DisplayTarget {
    pub const ALL: [DisplayTarget; 7] = [
        DisplayTarget::Final,
        DisplayTarget::GPosition,
        DisplayTarget::GNormals,
        DisplayTarget::GAlbedo,
        DisplayTarget::Depth,
        DisplayTarget::Bright,
        DisplayTarget::Blurred,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Final => "final",
            Self::GPosition => "position",
            Self::GNormals => "normals",
            Self::GAlbedo => "albedo",
            Self::Depth => "depth",
            Self::Bright => "bright",
            Self::Blurred => "blurred",
        }
    }

    /// The next target in [`DisplayTarget::ALL`], wrapping around.
    pub fn cycle(self) -> Self {
        let index = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

/// The render target group that owns a displayed image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetOwner {
    Geometry,
    Shading,
    PingPong,
}

/// Routes a display target to the group and role holding its image.
pub fn final_texture_to_render(display: DisplayTarget) -> (TargetOwner, AttachmentRole) {
    match display {
        DisplayTarget::Final => (TargetOwner::Shading, AttachmentRole::Color),
        DisplayTarget::GPosition => (TargetOwner::Geometry, AttachmentRole::GPosition),
        DisplayTarget::GNormals => (TargetOwner::Geometry, AttachmentRole::GNormal),
        DisplayTarget::GAlbedo => (TargetOwner::Geometry, AttachmentRole::GAlbedo),
        DisplayTarget::Depth => (TargetOwner::Geometry, AttachmentRole::Depth),
        DisplayTarget::Bright => (TargetOwner::Shading, AttachmentRole::Bright),
        DisplayTarget::Blurred => (TargetOwner::PingPong, AttachmentRole::Blurred),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    pub enabled: bool,
    /// Blur passes per frame. Even counts end on the presented target.
    pub iterations: u32,
    /// Luminance above which a pixel feeds the bloom.
    pub threshold: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            iterations: 10,
            threshold: 1.0,
        }
    }
}

/// Most layers the relief ray-march takes; the mesh shaders loop this many times.
pub const MAX_RELIEF_LAYERS: f32 = 64.0;
pub const MAX_HEIGHT_SCALE: f32 = 0.5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliefSettings {
    pub enabled: bool,
    pub height_scale: f32,
    pub min_layers: f32,
    pub max_layers: f32,
    /// Index of the procedural texture set used by relief materials.
    pub texture_set: usize,
}

impl Default for ReliefSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            height_scale: 0.08,
            min_layers: 8.0,
            max_layers: 32.0,
            texture_set: 0,
        }
    }
}

impl ReliefSettings {
    /// Clamps the layer range to `1..=MAX_RELIEF_LAYERS` with `min <= max`,
    /// and the height scale to `0..=MAX_HEIGHT_SCALE`. NaN falls to the lower bound.
    pub fn sanitized(&self) -> Self {
        let max_layers = self.max_layers.max(1.0).min(MAX_RELIEF_LAYERS);
        Self {
            height_scale: self.height_scale.max(0.0).min(MAX_HEIGHT_SCALE),
            min_layers: self.min_layers.max(1.0).min(max_layers),
            max_layers,
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub pipeline: PipelineKind,
    pub display: DisplayTarget,
    pub bloom: BloomSettings,
    pub relief: ReliefSettings,
}

impl RenderSettings {
    /// Copy with out-of-range relief parameters clamped; logs when anything moved.
    pub fn sanitized(&self) -> Self {
        let relief = self.relief.sanitized();
        if relief != self.relief {
            log::warn!(
                "Relief settings clamped: layers [{}..{}] -> [{}..{}], height scale {} -> {}",
                self.relief.min_layers,
                self.relief.max_layers,
                relief.min_layers,
                relief.max_layers,
                self.relief.height_scale,
                relief.height_scale
            );
        }
        Self {
            relief,
            ..self.clone()
        }
    }

    /// One-line summary for the window title.
    pub fn summary(&self) -> String {
        let pipeline = match self.pipeline {
            PipelineKind::Forward => "forward",
            PipelineKind::Deferred => "deferred",
        };
        let bloom = if self.bloom.enabled {
            format!("bloom x{} @{:.2}", self.bloom.iterations, self.bloom.threshold)
        } else {
            "bloom off".to_owned()
        };
        let relief = if self.relief.enabled {
            format!(
                "relief {:.2} [{}..{}] set {}",
                self.relief.height_scale,
                self.relief.min_layers,
                self.relief.max_layers,
                self.relief.texture_set
            )
        } else {
            "relief off".to_owned()
        };
        format!("{pipeline} | {} | {bloom} | {relief}", self.display.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_table() {
        use AttachmentRole::*;
        use TargetOwner::*;
        let expected = [
            (DisplayTarget::Final, Shading, Color),
            (DisplayTarget::GPosition, Geometry, GPosition),
            (DisplayTarget::GNormals, Geometry, GNormal),
            (DisplayTarget::GAlbedo, Geometry, GAlbedo),
            (DisplayTarget::Depth, Geometry, Depth),
            (DisplayTarget::Bright, Shading, Bright),
            (DisplayTarget::Blurred, PingPong, Blurred),
        ];
        for (display, owner, role) in expected {
            assert_eq!(final_texture_to_render(display), (owner, role), "{display:?}");
        }
    }

    #[test]
    fn display_cycle_visits_every_target() {
        let mut seen = vec![DisplayTarget::Final];
        let mut current = DisplayTarget::Final.cycle();
        while current != DisplayTarget::Final {
            seen.push(current);
            current = current.cycle();
        }
        assert_eq!(seen, DisplayTarget::ALL);
    }

    #[test]
    fn relief_layers_are_clamped_to_march_bound() {
        let relief = ReliefSettings {
            min_layers: 0.0,
            max_layers: 200.0,
            height_scale: 3.0,
            ..ReliefSettings::default()
        }
        .sanitized();
        assert_eq!(relief.min_layers, 1.0);
        assert_eq!(relief.max_layers, MAX_RELIEF_LAYERS);
        assert_eq!(relief.height_scale, MAX_HEIGHT_SCALE);

        let inverted = ReliefSettings {
            min_layers: 40.0,
            max_layers: 0.0,
            ..ReliefSettings::default()
        }
        .sanitized();
        assert_eq!((inverted.min_layers, inverted.max_layers), (1.0, 1.0));

        let nan = ReliefSettings {
            min_layers: f32::NAN,
            max_layers: f32::NAN,
            ..ReliefSettings::default()
        }
        .sanitized();
        assert_eq!((nan.min_layers, nan.max_layers), (1.0, 1.0));
    }

    #[test]
    fn defaults_are_already_in_range() {
        let settings = RenderSettings::default();
        assert_eq!(settings.sanitized(), settings);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings: RenderSettings = toml::from_str(
            r#"
            pipeline = "forward"
            [bloom]
            iterations = 4
            "#,
        )
        .expect("valid settings");
        assert_eq!(settings.pipeline, PipelineKind::Forward);
        assert_eq!(settings.bloom.iterations, 4);
        assert!(settings.bloom.enabled);
        assert_eq!(settings.relief, ReliefSettings::default());
    }
}
