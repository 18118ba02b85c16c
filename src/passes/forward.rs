//! Forward pass: shades meshes directly into the shading target.

use super::geometry::MESH_INPUTS;
use super::{DrawItem, FrameBindings, draw_entities, report_missing};
use crate::attachment::GpuImage;
use crate::bindings::Layouts;
use crate::catalog::Catalog;
use crate::program::{Program, ProgramDesc, depth_state, opaque_target};
use crate::render_target::{RenderTargetGroup, RenderTargetKind, ZBUFFER_FORMAT};

pub struct ForwardPass {
    program: Option<Program>,
}

impl ForwardPass {
    pub fn new(device: &wgpu::Device, layouts: &Layouts) -> Self {
        let program = Program::new(
            device,
            ProgramDesc {
                label: "forward",
                source: include_str!("../shaders/forward.wgsl"),
                inputs: MESH_INPUTS,
                bind_group_layouts: &[&layouts.global, &layouts.local, &layouts.material],
                targets: RenderTargetKind::Shading
                    .target_formats(0)
                    .into_iter()
                    .map(opaque_target)
                    .collect(),
                depth_stencil: depth_state(ZBUFFER_FORMAT, true, wgpu::CompareFunction::Less),
                cull_mode: Some(wgpu::Face::Back),
            },
        );
        report_missing("Forward", &program);
        Self { program }
    }

    /// Clears `target` and draws every item lit by all scene lights.
    pub fn render(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        target: &RenderTargetGroup<GpuImage>,
        catalog: &mut Catalog,
        draws: &[DrawItem],
        bindings: &FrameBindings<'_>,
    ) {
        let mut pass = target.bind(encoder, true);
        if let Some(program) = &self.program {
            draw_entities(device, &mut pass, program, catalog, draws, bindings);
        }
    }
}
