//! Keyboard debug controls over the render settings and scene lights.
//!
//! | key          | effect                              |
//! |--------------|-------------------------------------|
//! | `P`          | forward / deferred                  |
//! | `T`          | next display target                 |
//! | `B`          | bloom on / off                      |
//! | `[` `]`      | bloom iterations -2 / +2            |
//! | `-` `=`      | bright threshold -0.1 / +0.1        |
//! | `R`          | relief mapping on / off             |
//! | `,` `.`      | relief height scale -0.01 / +0.01   |
//! | `U` `I`      | relief min layers -1 / +1           |
//! | `J` `K`      | relief max layers -4 / +4           |
//! | `N`          | next relief texture set             |
//! | `Up` `Down`  | light intensity +10 / -10           |

use winit::keyboard::KeyCode;

use crate::scene::Light;
use crate::settings::{MAX_HEIGHT_SCALE, MAX_RELIEF_LAYERS, PipelineKind, RenderSettings};

/// Applies the keys pressed this frame to `settings`.
///
/// `texture_sets` is the number of relief texture sets available.
/// Returns true when anything changed.
pub fn apply_keys(
    settings: &mut RenderSettings,
    texture_sets: usize,
    pressed: impl Fn(KeyCode) -> bool,
) -> bool {
    let before = settings.clone();

    if pressed(KeyCode::KeyP) {
        settings.pipeline = match settings.pipeline {
            PipelineKind::Forward => PipelineKind::Deferred,
            PipelineKind::Deferred => PipelineKind::Forward,
        };
    }
    if pressed(KeyCode::KeyT) {
        settings.display = settings.display.cycle();
    }

    let bloom = &mut settings.bloom;
    if pressed(KeyCode::KeyB) {
        bloom.enabled = !bloom.enabled;
    }
    if pressed(KeyCode::BracketLeft) {
        bloom.iterations = bloom.iterations.saturating_sub(2);
    }
    if pressed(KeyCode::BracketRight) {
        bloom.iterations += 2;
    }
    if pressed(KeyCode::Minus) {
        bloom.threshold = (bloom.threshold - 0.1).max(0.0);
    }
    if pressed(KeyCode::Equal) {
        bloom.threshold += 0.1;
    }

    let relief = &mut settings.relief;
    if pressed(KeyCode::KeyR) {
        relief.enabled = !relief.enabled;
    }
    if pressed(KeyCode::Comma) {
        relief.height_scale = (relief.height_scale - 0.01).max(0.0);
    }
    if pressed(KeyCode::Period) {
        relief.height_scale = (relief.height_scale + 0.01).min(MAX_HEIGHT_SCALE);
    }
    if pressed(KeyCode::KeyU) {
        relief.min_layers = (relief.min_layers - 1.0).max(1.0);
    }
    if pressed(KeyCode::KeyI) {
        relief.min_layers = (relief.min_layers + 1.0).min(relief.max_layers);
    }
    if pressed(KeyCode::KeyJ) {
        relief.max_layers = (relief.max_layers - 4.0).max(relief.min_layers);
    }
    if pressed(KeyCode::KeyK) {
        relief.max_layers = (relief.max_layers + 4.0).min(MAX_RELIEF_LAYERS);
    }
    if pressed(KeyCode::KeyN) && texture_sets > 0 {
        relief.texture_set = (relief.texture_set + 1) % texture_sets;
    }

    let changed = *settings != before;
    if changed {
        log::info!("Render settings: {}", settings.summary());
    }
    changed
}

/// Steps the intensity of every light. Returns true when a key was pressed.
pub fn adjust_lights(lights: &mut [Light], pressed: impl Fn(KeyCode) -> bool) -> bool {
    let step: i32 = match (pressed(KeyCode::ArrowUp), pressed(KeyCode::ArrowDown)) {
        (true, false) => 10,
        (false, true) => -10,
        _ => return false,
    };
    for light in lights.iter_mut() {
        let intensity = (light.intensity() as i32 + step).max(0) as u32;
        light.set_intensity(intensity);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DisplayTarget;
    use glam::Vec3;

    fn press(keys: &'static [KeyCode]) -> impl Fn(KeyCode) -> bool {
        move |key| keys.contains(&key)
    }

    #[test]
    fn nothing_pressed_changes_nothing() {
        let mut settings = RenderSettings::default();
        assert!(!apply_keys(&mut settings, 2, press(&[])));
        assert_eq!(settings, RenderSettings::default());
    }

    #[test]
    fn toggles_pipeline_display_and_bloom() {
        let mut settings = RenderSettings::default();
        assert!(apply_keys(
            &mut settings,
            2,
            press(&[KeyCode::KeyP, KeyCode::KeyT, KeyCode::KeyB])
        ));
        assert_eq!(settings.pipeline, PipelineKind::Forward);
        assert_eq!(settings.display, DisplayTarget::GPosition);
        assert!(!settings.bloom.enabled);
    }

    #[test]
    fn bloom_iterations_stay_even_and_non_negative() {
        let mut settings = RenderSettings::default();
        settings.bloom.iterations = 2;
        apply_keys(&mut settings, 2, press(&[KeyCode::BracketLeft]));
        apply_keys(&mut settings, 2, press(&[KeyCode::BracketLeft]));
        assert_eq!(settings.bloom.iterations, 0);
        apply_keys(&mut settings, 2, press(&[KeyCode::BracketRight]));
        assert_eq!(settings.bloom.iterations, 2);
    }

    #[test]
    fn relief_layers_keep_min_below_max() {
        let mut settings = RenderSettings::default();
        settings.relief.min_layers = 8.0;
        settings.relief.max_layers = 10.0;
        apply_keys(&mut settings, 2, press(&[KeyCode::KeyJ]));
        assert_eq!(settings.relief.max_layers, 8.0);
        apply_keys(&mut settings, 2, press(&[KeyCode::KeyI]));
        assert_eq!(settings.relief.min_layers, 8.0);
    }

    #[test]
    fn max_layers_stop_at_march_bound() {
        let mut settings = RenderSettings::default();
        for _ in 0..40 {
            apply_keys(&mut settings, 2, press(&[KeyCode::KeyK]));
        }
        assert_eq!(settings.relief.max_layers, MAX_RELIEF_LAYERS);
    }

    #[test]
    fn texture_set_wraps() {
        let mut settings = RenderSettings::default();
        apply_keys(&mut settings, 2, press(&[KeyCode::KeyN]));
        assert_eq!(settings.relief.texture_set, 1);
        apply_keys(&mut settings, 2, press(&[KeyCode::KeyN]));
        assert_eq!(settings.relief.texture_set, 0);
    }

    #[test]
    fn light_intensity_clamps() {
        let mut lights = [Light::point(Vec3::ZERO, Vec3::ONE).with_intensity(5)];
        assert!(adjust_lights(&mut lights, press(&[KeyCode::ArrowDown])));
        assert_eq!(lights[0].intensity(), 0);
        for _ in 0..20 {
            adjust_lights(&mut lights, press(&[KeyCode::ArrowUp]));
        }
        assert_eq!(lights[0].intensity(), Light::MAX_INTENSITY);
        assert!(!adjust_lights(&mut lights, press(&[])));
    }
}
