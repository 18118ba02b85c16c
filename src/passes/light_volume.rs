//! Light-volume pass: draws a proxy for every light over the shaded image.
//!
//! Proxies are depth-tested against the scene but write no depth and add
//! their tint to both shading targets, so bright lights also feed bloom.

use super::report_missing;
use crate::attachment::{AttachmentRole, GpuImage};
use crate::bindings::Layouts;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, MeshData};
use crate::program::{Program, ProgramDesc, ProgramInput, additive_target, depth_state};
use crate::render_target::{RenderTargetGroup, RenderTargetKind, ZBUFFER_FORMAT};
use crate::scene::{Light, LightKind};
use crate::uniform_stream::{FrameRegion, UniformStream};

const PROXY_INPUTS: &[ProgramInput] = &[ProgramInput::new("position", 0)];

pub struct LightVolumePass {
    program: Option<Program>,
    sphere: Mesh,
    plane: Mesh,
}

impl LightVolumePass {
    pub fn new(gpu: &GpuContext, layouts: &Layouts) -> Self {
        let program = Program::new(
            &gpu.device,
            ProgramDesc {
                label: "light volume",
                source: include_str!("../shaders/light_volume.wgsl"),
                inputs: PROXY_INPUTS,
                bind_group_layouts: &[&layouts.local],
                targets: RenderTargetKind::Shading
                    .target_formats(0)
                    .into_iter()
                    .map(additive_target)
                    .collect(),
                depth_stencil: depth_state(ZBUFFER_FORMAT, false, wgpu::CompareFunction::Less),
                cull_mode: None,
            },
        );
        report_missing("Light volume", &program);
        Self {
            program,
            sphere: Mesh::new(gpu, "Point Light Proxy", &MeshData::sphere(16, 8)),
            plane: Mesh::new(gpu, "Directional Light Proxy", &MeshData::plane(1.0, 1.0)),
        }
    }

    /// Copies the geometry depth buffer into the shading group so proxies
    /// are hidden behind scene geometry.
    pub fn copy_depth(
        encoder: &mut wgpu::CommandEncoder,
        from: &RenderTargetGroup<GpuImage>,
        to: &RenderTargetGroup<GpuImage>,
    ) {
        let (Some(src), Some(dst)) = (
            from.texture(AttachmentRole::ZBuffer),
            to.texture(AttachmentRole::ZBuffer),
        ) else {
            log::warn!("Depth copy skipped: a depth buffer is missing");
            return;
        };
        if (from.width(), from.height()) != (to.width(), to.height()) {
            log::warn!(
                "Depth copy skipped: {}x{} does not match {}x{}",
                from.width(),
                from.height(),
                to.width(),
                to.height()
            );
            return;
        }
        encoder.copy_texture_to_texture(
            src.texture.as_image_copy(),
            dst.texture.as_image_copy(),
            src.texture.size(),
        );
    }

    /// Draws one proxy per light into `target` without clearing it.
    ///
    /// `regions[i]` is the local record of `lights[i]`; records not written
    /// this frame are skipped.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        target: &RenderTargetGroup<GpuImage>,
        lights: &[Light],
        regions: &[FrameRegion],
        locals: &UniformStream,
        local: &wgpu::BindGroup,
    ) {
        let Some(program) = &self.program else {
            return;
        };
        let mut pass = target.bind(encoder, false);

        for (light, region) in lights.iter().zip(regions) {
            if !locals.is_current(region) {
                log::warn!("Light proxy has no local parameters this frame; skipped");
                continue;
            }
            let mesh = match light.kind {
                LightKind::Point => &mut self.sphere,
                LightKind::Directional => &mut self.plane,
            };
            let submesh = &mut mesh.submeshes[0];
            let vertex_array = submesh.vertex_arrays.find_or_create(
                program.id(),
                program.inputs(),
                &submesh.layout,
                |binding| program.build_pipeline(device, Some(binding)),
            );

            pass.set_pipeline(&vertex_array.state);
            pass.set_bind_group(0, local, &[region.offset]);
            mesh.draw_submesh(&mut pass, 0);
        }
    }
}
