//! Composite pass: presents the selected render target on the surface.

use wgpu::util::DeviceExt;

use super::report_missing;
use crate::bindings::{Layouts, texture_bind_group};
use crate::program::{Program, ProgramDesc, opaque_target};
use crate::settings::DisplayTarget;

/// Uniforms of the composite shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CompositeParams {
    /// 0 tone-mapped HDR, 1 clamped colour, 2 depth, 3 signed vector, 4 position.
    pub mode: u32,
    pub add_bloom: u32,
    pub far: f32,
    pub exposure: f32,
}

const MODE_HDR: u32 = 0;
const MODE_COLOR: u32 = 1;
const MODE_DEPTH: u32 = 2;
const MODE_VECTOR: u32 = 3;
const MODE_POSITION: u32 = 4;

/// How `display` is decoded for the screen.
///
/// Bloom is only added to the final image.
pub fn composite_params(display: DisplayTarget, bloom: bool, far: f32) -> CompositeParams {
    let mode = match display {
        DisplayTarget::Final | DisplayTarget::Bright | DisplayTarget::Blurred => MODE_HDR,
        DisplayTarget::GAlbedo => MODE_COLOR,
        DisplayTarget::Depth => MODE_DEPTH,
        DisplayTarget::GNormals => MODE_VECTOR,
        DisplayTarget::GPosition => MODE_POSITION,
    };
    CompositeParams {
        mode,
        add_bloom: (bloom && display == DisplayTarget::Final) as u32,
        far,
        exposure: 1.0,
    }
}

pub struct CompositePass {
    program: Option<Program>,
    layout: wgpu::BindGroupLayout,
    params: wgpu::Buffer,
}

impl CompositePass {
    pub fn new(device: &wgpu::Device, layouts: &Layouts, surface_format: wgpu::TextureFormat) -> Self {
        let program = Program::new(
            device,
            ProgramDesc {
                label: "composite",
                source: include_str!("../shaders/composite.wgsl"),
                inputs: &[],
                bind_group_layouts: &[&layouts.composite],
                targets: vec![opaque_target(surface_format)],
                depth_stencil: None,
                cull_mode: None,
            },
        );
        report_missing("Composite", &program);

        let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Composite Params"),
            contents: bytemuck::bytes_of(&composite_params(DisplayTarget::Final, false, 1.0)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            program,
            layout: layouts.composite.clone(),
            params,
        }
    }

    /// Draws `displayed`, decoded per `params`, over the whole of `surface`.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        surface: &wgpu::TextureView,
        displayed: &wgpu::TextureView,
        bloom: &wgpu::TextureView,
        params: &CompositeParams,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Composite"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        let Some(pipeline) = self.program.as_ref().and_then(Program::fullscreen_pipeline) else {
            return;
        };

        queue.write_buffer(&self.params, 0, bytemuck::bytes_of(params));
        let bind_group = texture_bind_group(
            device,
            "Composite",
            &self.layout,
            &[displayed, bloom],
            None,
            Some(&self.params),
        );
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_fit_shader_struct() {
        assert_eq!(std::mem::size_of::<CompositeParams>(), 16);
    }

    #[test]
    fn bloom_only_added_to_final_image() {
        assert_eq!(composite_params(DisplayTarget::Final, true, 1000.0).add_bloom, 1);
        assert_eq!(composite_params(DisplayTarget::Final, false, 1000.0).add_bloom, 0);
        assert_eq!(composite_params(DisplayTarget::Bright, true, 1000.0).add_bloom, 0);
    }

    #[test]
    fn each_target_has_a_decode_mode() {
        let modes: Vec<u32> = DisplayTarget::ALL
            .iter()
            .map(|t| composite_params(*t, true, 1000.0).mode)
            .collect();
        assert_eq!(modes, [0, 4, 3, 1, 2, 0, 0]);
        assert_eq!(composite_params(DisplayTarget::Depth, false, 250.0).far, 250.0);
    }
}
