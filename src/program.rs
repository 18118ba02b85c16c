//! Shader programs.
//!
//! A [`Program`] is a compiled WGSL module plus everything needed to turn it
//! into pipelines: its pipeline layout, the vertex inputs it declares, its
//! colour targets and depth state. Mesh programs are instantiated once per
//! submesh vertex layout through the submesh's vertex array cache;
//! full-screen programs (no vertex inputs) build their single pipeline up
//! front.
//!
//! Compilation failures are logged and yield `None`. Callers skip the work
//! that needed the program instead of aborting the frame.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::vertex_array::VertexBinding;

/// Identity of a compiled program. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramId(u32);

impl ProgramId {
    pub fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A vertex input declared by a program's vertex stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramInput {
    pub name: &'static str,
    pub location: u32,
}

impl ProgramInput {
    pub const fn new(name: &'static str, location: u32) -> Self {
        Self { name, location }
    }
}

/// Everything needed to compile a program.
pub struct ProgramDesc<'a> {
    pub label: &'static str,
    pub source: &'static str,
    pub inputs: &'static [ProgramInput],
    pub bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
    pub targets: Vec<Option<wgpu::ColorTargetState>>,
    pub depth_stencil: Option<wgpu::DepthStencilState>,
    pub cull_mode: Option<wgpu::Face>,
}

pub struct Program {
    id: ProgramId,
    label: &'static str,
    module: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    inputs: &'static [ProgramInput],
    targets: Vec<Option<wgpu::ColorTargetState>>,
    depth_stencil: Option<wgpu::DepthStencilState>,
    cull_mode: Option<wgpu::Face>,
    fullscreen: Option<wgpu::RenderPipeline>,
}

impl Program {
    /// Compiles `desc.source` and builds the pipeline layout.
    ///
    /// Returns `None` after logging if the module fails to compile.
    pub fn new(device: &wgpu::Device, desc: ProgramDesc<'_>) -> Option<Self> {
        let module = compile(device, desc.label, desc.source)?;

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: desc.bind_group_layouts,
            push_constant_ranges: &[],
        });

        let mut program = Self {
            id: ProgramId::next(),
            label: desc.label,
            module,
            layout,
            inputs: desc.inputs,
            targets: desc.targets,
            depth_stencil: desc.depth_stencil,
            cull_mode: desc.cull_mode,
            fullscreen: None,
        };

        if program.inputs.is_empty() {
            let pipeline = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                program.build_pipeline(device, None)
            }));
            match pipeline {
                Ok(pipeline) => program.fullscreen = Some(pipeline),
                Err(_) => {
                    log::error!("Pipeline creation for '{}' failed", program.label);
                    return None;
                }
            }
        }

        log::info!("Compiled program '{}'", program.label);
        Some(program)
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn inputs(&self) -> &'static [ProgramInput] {
        self.inputs
    }

    /// The pipeline of a full-screen program.
    pub fn fullscreen_pipeline(&self) -> Option<&wgpu::RenderPipeline> {
        self.fullscreen.as_ref()
    }

    /// Builds a pipeline reading vertices through `binding`.
    pub fn build_pipeline(
        &self,
        device: &wgpu::Device,
        binding: Option<&VertexBinding>,
    ) -> wgpu::RenderPipeline {
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> =
            binding.map(VertexBinding::buffer_layout).into_iter().collect();

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(self.label),
            layout: Some(&self.layout),
            vertex: wgpu::VertexState {
                module: &self.module,
                entry_point: Some("vs_main"),
                buffers: &buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.module,
                entry_point: Some("fs_main"),
                targets: &self.targets,
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: self.cull_mode,
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: self.depth_stencil.clone(),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }
}

fn compile(device: &wgpu::Device, label: &str, source: &str) -> Option<wgpu::ShaderModule> {
    // Invalid WGSL can reach the uncaptured error handler, which panics.
    let module = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        })
    }));
    let Ok(module) = module else {
        log::error!("Shader '{label}' failed to compile");
        return None;
    };

    let info = pollster::block_on(module.get_compilation_info());
    let mut failed = false;
    for message in &info.messages {
        let line = message
            .location
            .as_ref()
            .map(|loc| loc.line_number)
            .unwrap_or(0);
        match message.message_type {
            wgpu::CompilationMessageType::Error => {
                failed = true;
                log::error!("{label}:{line}: {}", message.message);
            }
            wgpu::CompilationMessageType::Warning => {
                log::warn!("{label}:{line}: {}", message.message)
            }
            wgpu::CompilationMessageType::Info => {
                log::debug!("{label}:{line}: {}", message.message)
            }
        }
    }

    (!failed).then_some(module)
}

/// Colour target writing `format` without blending.
pub fn opaque_target(format: wgpu::TextureFormat) -> Option<wgpu::ColorTargetState> {
    Some(wgpu::ColorTargetState {
        format,
        blend: None,
        write_mask: wgpu::ColorWrites::ALL,
    })
}

/// Colour target adding its output to what is already there.
pub fn additive_target(format: wgpu::TextureFormat) -> Option<wgpu::ColorTargetState> {
    let add = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    };
    Some(wgpu::ColorTargetState {
        format,
        blend: Some(wgpu::BlendState {
            color: add,
            alpha: add,
        }),
        write_mask: wgpu::ColorWrites::ALL,
    })
}

/// Depth state against a `format` depth buffer.
pub fn depth_state(
    format: wgpu::TextureFormat,
    write: bool,
    compare: wgpu::CompareFunction,
) -> Option<wgpu::DepthStencilState> {
    Some(wgpu::DepthStencilState {
        format,
        depth_write_enabled: write,
        depth_compare: compare,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_ids_are_unique() {
        let ids: Vec<_> = (0..8).map(|_| ProgramId::next()).collect();
        for (i, a) in ids.iter().enumerate() {
            assert!(ids[i + 1..].iter().all(|b| b != a));
        }
    }

    #[test]
    fn additive_target_adds_color() {
        let target = additive_target(wgpu::TextureFormat::Rgba16Float).and_then(|t| t.blend);
        let blend = target.expect("blend state");
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::One);
    }
}
