//! Shading pass: lights the G-buffer into the shading target.

use super::report_missing;
use crate::attachment::{AttachmentRole, GpuImage};
use crate::bindings::{Layouts, texture_bind_group};
use crate::program::{Program, ProgramDesc, depth_state, opaque_target};
use crate::render_target::{RenderTargetGroup, RenderTargetKind, ZBUFFER_FORMAT};

/// G-buffer roles in binding order of the shading program.
const GBUFFER_INPUTS: [AttachmentRole; 4] = [
    AttachmentRole::GPosition,
    AttachmentRole::GNormal,
    AttachmentRole::GAlbedo,
    AttachmentRole::Depth,
];

pub struct ShadingPass {
    program: Option<Program>,
    gbuffer_layout: wgpu::BindGroupLayout,
}

impl ShadingPass {
    pub fn new(device: &wgpu::Device, layouts: &Layouts) -> Self {
        let program = Program::new(
            device,
            ProgramDesc {
                label: "shading",
                source: include_str!("../shaders/shading.wgsl"),
                inputs: &[],
                bind_group_layouts: &[&layouts.global, &layouts.gbuffer],
                targets: RenderTargetKind::Shading
                    .target_formats(0)
                    .into_iter()
                    .map(opaque_target)
                    .collect(),
                // The shading group carries a depth buffer; full-screen
                // shading neither tests nor writes it.
                depth_stencil: depth_state(ZBUFFER_FORMAT, false, wgpu::CompareFunction::Always),
                cull_mode: None,
            },
        );
        report_missing("Shading", &program);
        Self {
            program,
            gbuffer_layout: layouts.gbuffer.clone(),
        }
    }

    /// Clears `target` and shades every G-buffer texel into its colour and
    /// bright-pass images.
    pub fn render(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        geometry: &RenderTargetGroup<GpuImage>,
        target: &RenderTargetGroup<GpuImage>,
        global: &wgpu::BindGroup,
    ) {
        let Some(pipeline) = self.program.as_ref().and_then(Program::fullscreen_pipeline) else {
            drop(target.bind(encoder, true));
            return;
        };
        let views: Option<Vec<&wgpu::TextureView>> =
            GBUFFER_INPUTS.iter().map(|role| geometry.view(*role)).collect();
        let Some(views) = views else {
            log::warn!("G-buffer is incomplete; shading skipped");
            drop(target.bind(encoder, true));
            return;
        };
        let gbuffer = texture_bind_group(device, "G-Buffer", &self.gbuffer_layout, &views, None, None);

        let mut pass = target.bind(encoder, true);
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, global, &[]);
        pass.set_bind_group(1, &gbuffer, &[]);
        pass.draw(0..3, 0..1);
    }
}
