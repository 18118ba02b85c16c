//! Frame orchestration for the forward and deferred paths.
//!
//! A frame is two calls. [`Renderer::update`] writes the global and local
//! parameter streams for the scene and camera; [`Renderer::render`] records
//! the passes of the selected path into one command buffer and submits it.
//!
//! ```text
//! deferred: geometry -> shading -> depth copy -> light volumes -> [bloom] -> composite
//! forward:  forward  ->                          light volumes -> [bloom] -> composite
//! ```
//!
//! # Example
//!
//! ```no_run
//! # fn frame(gpu: &umbra::GpuContext, scene: &mut umbra::Scene, surface: &wgpu::TextureView) {
//! use umbra::{Camera, Renderer, RenderSettings};
//!
//! let settings = RenderSettings::default();
//! let mut renderer = Renderer::new(gpu);
//! let camera = Camera::default().matrices(gpu.aspect());
//!
//! renderer.update(gpu, scene, &camera, &settings);
//! renderer.render(gpu, scene, &settings, surface);
//! # }
//! ```

use crate::attachment::{AttachmentRole, GpuImage};
use crate::bindings::{Layouts, uniform_bind_group};
use crate::camera::CameraMatrices;
use crate::gpu::GpuContext;
use crate::params::{GLOBAL_BLOCK_SIZE, LOCAL_BLOCK_SIZE, write_globals, write_locals};
use crate::passes::{
    BloomPass, CompositePass, ForwardPass, FrameBindings, GeometryPass, LightVolumePass,
    ShadingPass, build_draw_list, composite_params,
};
use crate::render_target::{RenderTargetGroup, RenderTargetKind};
use crate::scene::Scene;
use crate::settings::{
    DisplayTarget, PipelineKind, RenderSettings, TargetOwner, final_texture_to_render,
};
use crate::texture::material_sampler;
use crate::uniform_stream::{FrameRegion, UniformBuffer};

/// One step of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Geometry,
    Shading,
    DepthCopy,
    Forward,
    LightVolumes,
    Bloom,
    Composite,
}

/// The stages `settings` selects, in recording order.
pub fn frame_stages(settings: &RenderSettings) -> Vec<Stage> {
    let mut stages = match settings.pipeline {
        PipelineKind::Deferred => vec![Stage::Geometry, Stage::Shading, Stage::DepthCopy],
        PipelineKind::Forward => vec![Stage::Forward],
    };
    stages.push(Stage::LightVolumes);
    if settings.bloom.enabled {
        stages.push(Stage::Bloom);
    }
    stages.push(Stage::Composite);
    stages
}

/// The target groups a frame with `settings` uses, the displayed one included.
///
/// The composite always samples the ping-pong group for bloom.
pub fn frame_targets(settings: &RenderSettings) -> Vec<TargetOwner> {
    let mut owners = Vec::with_capacity(3);
    let (displayed, _) = final_texture_to_render(settings.display);
    if settings.pipeline == PipelineKind::Deferred || displayed == TargetOwner::Geometry {
        owners.push(TargetOwner::Geometry);
    }
    owners.extend([TargetOwner::Shading, TargetOwner::PingPong]);
    owners
}

/// True when `settings` displays a G-buffer image the selected path never writes.
fn displays_stale_gbuffer(settings: &RenderSettings) -> bool {
    settings.pipeline == PipelineKind::Forward
        && final_texture_to_render(settings.display).0 == TargetOwner::Geometry
}

/// Regions written by the last [`Renderer::update`].
#[derive(Clone, Debug)]
struct FrameState {
    global: FrameRegion,
    light_proxies: Vec<FrameRegion>,
    far: f32,
}

pub struct Renderer {
    layouts: Layouts,
    geometry: RenderTargetGroup<GpuImage>,
    shading: RenderTargetGroup<GpuImage>,
    ping_pong: RenderTargetGroup<GpuImage>,
    globals: UniformBuffer,
    locals: UniformBuffer,
    global_group: wgpu::BindGroup,
    local_group: wgpu::BindGroup,
    local_alignment: usize,
    sampler: wgpu::Sampler,
    geometry_pass: GeometryPass,
    forward_pass: ForwardPass,
    shading_pass: ShadingPass,
    light_volume_pass: LightVolumePass,
    bloom_pass: BloomPass,
    composite_pass: CompositePass,
    frame: Option<FrameState>,
    stale_display_reported: Option<DisplayTarget>,
}

impl Renderer {
    /// Builds every program, target group and parameter buffer.
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;
        let limits = device.limits();
        let layouts = Layouts::new(device);

        let globals = UniformBuffer::new(device, "Global Params", GLOBAL_BLOCK_SIZE as u32);
        let locals = UniformBuffer::new(device, "Local Params", limits.max_uniform_buffer_binding_size);
        let global_group = uniform_bind_group(
            device,
            "Global Params",
            &layouts.global,
            globals.buffer(),
            GLOBAL_BLOCK_SIZE,
        );
        let local_group = uniform_bind_group(
            device,
            "Local Params",
            &layouts.local,
            locals.buffer(),
            LOCAL_BLOCK_SIZE,
        );

        let (width, height) = (gpu.width(), gpu.height());
        let renderer = Self {
            geometry: RenderTargetGroup::new(RenderTargetKind::Geometry, gpu, width, height),
            shading: RenderTargetGroup::new(RenderTargetKind::Shading, gpu, width, height),
            ping_pong: RenderTargetGroup::new(RenderTargetKind::PingPong, gpu, width, height),
            globals,
            locals,
            global_group,
            local_group,
            local_alignment: limits.min_uniform_buffer_offset_alignment as usize,
            sampler: material_sampler(gpu),
            geometry_pass: GeometryPass::new(device, &layouts),
            forward_pass: ForwardPass::new(device, &layouts),
            shading_pass: ShadingPass::new(device, &layouts),
            light_volume_pass: LightVolumePass::new(gpu, &layouts),
            bloom_pass: BloomPass::new(device, &layouts),
            composite_pass: CompositePass::new(device, &layouts, gpu.config.format),
            layouts,
            frame: None,
            stale_display_reported: None,
        };
        log::info!("Renderer ready at {width}x{height}");
        renderer
    }

    /// Reallocates every target group at the surface size.
    pub fn resize(&mut self, gpu: &GpuContext) {
        let (width, height) = (gpu.width(), gpu.height());
        for group in [&mut self.geometry, &mut self.shading, &mut self.ping_pong] {
            group.resize(gpu, width, height);
        }
    }

    /// Writes this frame's global and local parameters.
    ///
    /// Each entity receives its local region; regions from earlier frames
    /// become stale.
    pub fn update(
        &mut self,
        gpu: &GpuContext,
        scene: &mut Scene,
        camera: &CameraMatrices,
        settings: &RenderSettings,
    ) {
        let global = self
            .globals
            .write(&gpu.queue, |w| write_globals(w, camera, &scene.lights, settings));

        let alignment = self.local_alignment;
        let view_projection = camera.view_projection();
        let light_proxies = self.locals.write(&gpu.queue, |w| {
            write_locals(w, alignment, &view_projection, &mut scene.entities, &scene.lights)
        });

        self.frame = Some(FrameState {
            global,
            light_proxies,
            far: camera.far,
        });
    }

    /// The target group owning images of `owner`.
    pub fn target(&self, owner: TargetOwner) -> &RenderTargetGroup<GpuImage> {
        match owner {
            TargetOwner::Geometry => &self.geometry,
            TargetOwner::Shading => &self.shading,
            TargetOwner::PingPong => &self.ping_pong,
        }
    }

    /// Records and submits one frame, ending with the composite into `surface`.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        scene: &mut Scene,
        settings: &RenderSettings,
        surface: &wgpu::TextureView,
    ) {
        let Some(frame) = self.frame.clone() else {
            log::warn!("render called before update; frame skipped");
            return;
        };
        if !self.globals.stream().is_current(&frame.global) {
            log::warn!("Global parameters are stale; frame skipped");
            return;
        }
        for owner in frame_targets(settings) {
            let group = self.target(owner);
            if let Err(status) = group.status() {
                log::warn!("{} target unusable ({status}); frame skipped", group.kind().label());
                return;
            }
        }

        if displays_stale_gbuffer(settings) {
            if self.stale_display_reported != Some(settings.display) {
                log::warn!(
                    "{:?} is not written by the forward path; showing the last deferred frame",
                    settings.display
                );
                self.stale_display_reported = Some(settings.display);
            }
        } else {
            self.stale_display_reported = None;
        }

        let device = &gpu.device;
        let draws = build_draw_list(&scene.entities, scene.catalog.models(), self.locals.stream());
        let bindings = FrameBindings {
            global: &self.global_group,
            local: &self.local_group,
            material_layout: &self.layouts.material,
            sampler: &self.sampler,
            relief_set: settings.relief.texture_set,
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        let mut bloom_fresh = false;
        for stage in frame_stages(settings) {
            match stage {
                Stage::Geometry => self.geometry_pass.render(
                    device,
                    &mut encoder,
                    &self.geometry,
                    &mut scene.catalog,
                    &draws,
                    &bindings,
                ),
                Stage::Shading => self.shading_pass.render(
                    device,
                    &mut encoder,
                    &self.geometry,
                    &self.shading,
                    &self.global_group,
                ),
                Stage::DepthCopy => {
                    LightVolumePass::copy_depth(&mut encoder, &self.geometry, &self.shading)
                }
                Stage::Forward => self.forward_pass.render(
                    device,
                    &mut encoder,
                    &self.shading,
                    &mut scene.catalog,
                    &draws,
                    &bindings,
                ),
                Stage::LightVolumes => self.light_volume_pass.render(
                    device,
                    &mut encoder,
                    &self.shading,
                    &scene.lights,
                    &frame.light_proxies,
                    self.locals.stream(),
                    &self.local_group,
                ),
                Stage::Bloom => match self.shading.view(AttachmentRole::Bright) {
                    Some(bright) => {
                        bloom_fresh = self
                            .bloom_pass
                            .blur(
                                device,
                                &mut encoder,
                                &self.ping_pong,
                                bright,
                                settings.bloom.iterations,
                            )
                            .is_fresh();
                    }
                    None => log::warn!("Shading target has no bright image; bloom skipped"),
                },
                Stage::Composite => {
                    let (owner, role) = final_texture_to_render(settings.display);
                    let displayed = self.target(owner).view(role);
                    let bloom = BloomPass::blurred_texture(&self.ping_pong);
                    let (Some(displayed), Some(bloom)) = (displayed, bloom) else {
                        log::warn!("{:?} has no image to display", settings.display);
                        continue;
                    };
                    let params =
                        composite_params(settings.display, bloom_fresh, frame.far);
                    self.composite_pass.render(
                        device,
                        &gpu.queue,
                        &mut encoder,
                        surface,
                        displayed,
                        bloom,
                        &params,
                    );
                }
            }
        }

        gpu.queue.submit(Some(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BloomSettings;

    #[test]
    fn deferred_frame_runs_full_pipeline() {
        let settings = RenderSettings::default();
        assert_eq!(
            frame_stages(&settings),
            [
                Stage::Geometry,
                Stage::Shading,
                Stage::DepthCopy,
                Stage::LightVolumes,
                Stage::Bloom,
                Stage::Composite,
            ]
        );
    }

    #[test]
    fn forward_frame_skips_gbuffer_passes() {
        let settings = RenderSettings {
            pipeline: PipelineKind::Forward,
            bloom: BloomSettings {
                enabled: false,
                ..BloomSettings::default()
            },
            ..RenderSettings::default()
        };
        assert_eq!(
            frame_stages(&settings),
            [Stage::Forward, Stage::LightVolumes, Stage::Composite]
        );
    }

    #[test]
    fn forward_frame_ignores_gbuffer_unless_displayed() {
        let mut settings = RenderSettings {
            pipeline: PipelineKind::Forward,
            ..RenderSettings::default()
        };
        assert_eq!(
            frame_targets(&settings),
            [TargetOwner::Shading, TargetOwner::PingPong]
        );
        assert!(!displays_stale_gbuffer(&settings));

        settings.display = DisplayTarget::GNormals;
        assert_eq!(
            frame_targets(&settings),
            [TargetOwner::Geometry, TargetOwner::Shading, TargetOwner::PingPong]
        );
        assert!(displays_stale_gbuffer(&settings));
    }

    #[test]
    fn deferred_frame_uses_every_group() {
        for display in DisplayTarget::ALL {
            let settings = RenderSettings {
                display,
                ..RenderSettings::default()
            };
            assert_eq!(frame_targets(&settings).len(), 3, "{display:?}");
            assert!(!displays_stale_gbuffer(&settings));
        }
    }

    #[test]
    fn every_path_ends_with_composite() {
        for pipeline in [PipelineKind::Forward, PipelineKind::Deferred] {
            for enabled in [false, true] {
                let mut settings = RenderSettings {
                    pipeline,
                    ..RenderSettings::default()
                };
                settings.bloom.enabled = enabled;
                let stages = frame_stages(&settings);
                assert_eq!(stages.last(), Some(&Stage::Composite));
                assert_eq!(stages.contains(&Stage::Bloom), enabled);
            }
        }
    }
}
