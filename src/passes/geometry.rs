//! Geometry pass: fills the G-buffer.

use super::{DrawItem, FrameBindings, draw_entities, report_missing};
use crate::attachment::GpuImage;
use crate::bindings::Layouts;
use crate::catalog::Catalog;
use crate::program::{Program, ProgramDesc, ProgramInput, depth_state, opaque_target};
use crate::render_target::{RenderTargetGroup, RenderTargetKind, ZBUFFER_FORMAT};

/// Vertex inputs shared by the mesh programs.
pub(crate) const MESH_INPUTS: &[ProgramInput] = &[
    ProgramInput::new("position", 0),
    ProgramInput::new("normal", 1),
    ProgramInput::new("uv", 2),
    ProgramInput::new("tangent", 3),
];

pub struct GeometryPass {
    program: Option<Program>,
}

impl GeometryPass {
    pub fn new(device: &wgpu::Device, layouts: &Layouts) -> Self {
        let program = Program::new(
            device,
            ProgramDesc {
                label: "geometry",
                source: include_str!("../shaders/geometry.wgsl"),
                inputs: MESH_INPUTS,
                bind_group_layouts: &[&layouts.global, &layouts.local, &layouts.material],
                targets: RenderTargetKind::Geometry
                    .target_formats(0)
                    .into_iter()
                    .map(opaque_target)
                    .collect(),
                depth_stencil: depth_state(ZBUFFER_FORMAT, true, wgpu::CompareFunction::Less),
                cull_mode: Some(wgpu::Face::Back),
            },
        );
        report_missing("Geometry", &program);
        Self { program }
    }

    /// Clears `target` and writes position, normal, albedo, colour and depth
    /// for every draw.
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
        let Some(program) = &self.program else {
            return;
        };
        draw_entities(device, &mut pass, program, catalog, draws, bindings);
    }
}
