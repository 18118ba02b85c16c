//! Ping-pong Gaussian blur of the bright-pass image.
//!
//! Each step blurs in one direction, reading the previous step's output and
//! writing the other ping-pong target. The blurred result is read from
//! target 0, which the last step of an even-length run writes.

use wgpu::util::DeviceExt;

use super::report_missing;
use crate::attachment::{AttachmentRole, GpuImage};
use crate::bindings::{Layouts, texture_bind_group};
use crate::program::{Program, ProgramDesc, opaque_target};
use crate::render_target::{HDR_FORMAT, RenderTargetGroup};

/// Where a blur step reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlurInput {
    Source,
    Target(usize),
}

/// One direction of the blur.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlurStep {
    pub index: u32,
    /// Ping-pong target written by this step.
    pub target: usize,
    pub horizontal: bool,
    pub input: BlurInput,
}

/// What target 0 holds after a blur.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlurOutcome {
    /// The last step wrote target 0.
    Complete,
    /// Odd step count: target 0 holds the second-to-last step.
    LastStepDropped,
    /// Target 0 was not written; it still holds an earlier frame's image.
    Stale,
}

impl BlurOutcome {
    pub fn for_iterations(iterations: u32) -> Self {
        match iterations {
            0 | 1 => Self::Stale,
            n if n % 2 == 1 => Self::LastStepDropped,
            _ => Self::Complete,
        }
    }

    /// True when target 0 was written this frame and may be added to the image.
    pub fn is_fresh(self) -> bool {
        self != Self::Stale
    }
}

/// The steps of an `iterations`-long blur, in order.
pub fn blur_schedule(iterations: u32) -> impl Iterator<Item = BlurStep> {
    (0..iterations).map(|index| {
        let parity = (index % 2) as usize;
        BlurStep {
            index,
            target: 1 - parity,
            horizontal: parity == 0,
            input: if index == 0 {
                BlurInput::Source
            } else {
                BlurInput::Target(parity)
            },
        }
    })
}

/// Runs `draw` for every step of the blur and reports what target 0 holds.
pub fn blur_image(iterations: u32, mut draw: impl FnMut(&BlurStep)) -> BlurOutcome {
    for step in blur_schedule(iterations) {
        draw(&step);
    }
    BlurOutcome::for_iterations(iterations)
}

pub struct BloomPass {
    program: Option<Program>,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    /// Direction uniforms: `[vertical, horizontal]`.
    directions: [wgpu::Buffer; 2],
    last_reported: Option<u32>,
}

impl BloomPass {
    pub fn new(device: &wgpu::Device, layouts: &Layouts) -> Self {
        let program = Program::new(
            device,
            ProgramDesc {
                label: "blur",
                source: include_str!("../shaders/blur.wgsl"),
                inputs: &[],
                bind_group_layouts: &[&layouts.blur],
                targets: vec![opaque_target(HDR_FORMAT)],
                depth_stencil: None,
                cull_mode: None,
            },
        );
        report_missing("Blur", &program);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Blur Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let direction = |label: &str, horizontal: u32| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&[horizontal, 0, 0, 0]),
                usage: wgpu::BufferUsages::UNIFORM,
            })
        };

        Self {
            program,
            layout: layouts.blur.clone(),
            sampler,
            directions: [direction("Blur Vertical", 0), direction("Blur Horizontal", 1)],
            last_reported: None,
        }
    }

    /// Blurs `source` `iterations` times through `ping_pong`.
    pub fn blur(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        ping_pong: &RenderTargetGroup<GpuImage>,
        source: &wgpu::TextureView,
        iterations: u32,
    ) -> BlurOutcome {
        let Some(pipeline) = self.program.as_ref().and_then(Program::fullscreen_pipeline) else {
            return BlurOutcome::Stale;
        };
        let targets = [
            ping_pong.view(AttachmentRole::Blurred),
            ping_pong.view(AttachmentRole::BlurScratch),
        ];

        let outcome = blur_image(iterations, |step| {
            let input = match step.input {
                BlurInput::Source => Some(source),
                BlurInput::Target(index) => targets[index],
            };
            let Some(input) = input else {
                return;
            };
            let bind_group = texture_bind_group(
                device,
                "Blur",
                &self.layout,
                &[input],
                Some(&self.sampler),
                Some(&self.directions[step.horizontal as usize]),
            );
            let mut pass = ping_pong.bind_target(encoder, step.target, true);
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        });

        if self.last_reported != Some(iterations) {
            self.last_reported = Some(iterations);
            match outcome {
                BlurOutcome::Complete => {}
                BlurOutcome::LastStepDropped => log::warn!(
                    "Odd bloom iteration count {iterations}: the last blur step is not displayed"
                ),
                BlurOutcome::Stale => log::warn!(
                    "Bloom iteration count {iterations} never writes the blurred image; it is stale"
                ),
            }
        }
        outcome
    }

    /// The image holding the blur result.
    pub fn blurred_texture(ping_pong: &RenderTargetGroup<GpuImage>) -> Option<&wgpu::TextureView> {
        ping_pong.view(AttachmentRole::Blurred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_alternate_targets_and_directions() {
        let steps: Vec<_> = blur_schedule(4).collect();
        let targets: Vec<_> = steps.iter().map(|s| s.target).collect();
        let horizontal: Vec<_> = steps.iter().map(|s| s.horizontal).collect();
        assert_eq!(targets, [1, 0, 1, 0]);
        assert_eq!(horizontal, [true, false, true, false]);
        assert_eq!(steps[0].input, BlurInput::Source);
        assert_eq!(steps[1].input, BlurInput::Target(1));
        assert_eq!(steps[2].input, BlurInput::Target(0));
    }

    #[test]
    fn every_step_reads_the_target_it_does_not_write() {
        for step in blur_schedule(10).skip(1) {
            assert_eq!(step.input, BlurInput::Target(1 - step.target));
        }
    }

    #[test]
    fn even_counts_sample_source_once_and_end_on_target_zero() {
        for iterations in [2, 4, 10] {
            let mut sources = 0;
            let mut last = None;
            let outcome = blur_image(iterations, |step| {
                if step.input == BlurInput::Source {
                    sources += 1;
                }
                last = Some(step.target);
            });
            assert_eq!(sources, 1);
            assert_eq!(last, Some(0));
            assert_eq!(outcome, BlurOutcome::Complete);
        }
    }

    #[test]
    fn zero_iterations_draw_nothing_and_report_stale() {
        let mut draws = 0;
        assert_eq!(blur_image(0, |_| draws += 1), BlurOutcome::Stale);
        assert_eq!(draws, 0);
    }

    #[test]
    fn only_written_blurs_are_fresh() {
        assert!(!BlurOutcome::for_iterations(0).is_fresh());
        assert!(!BlurOutcome::for_iterations(1).is_fresh());
        assert!(BlurOutcome::for_iterations(3).is_fresh());
        assert!(BlurOutcome::for_iterations(10).is_fresh());
    }

    #[test]
    fn odd_counts_leave_last_step_in_scratch_target() {
        assert_eq!(BlurOutcome::for_iterations(1), BlurOutcome::Stale);
        assert_eq!(BlurOutcome::for_iterations(5), BlurOutcome::LastStepDropped);
        assert_eq!(blur_schedule(5).last().map(|s| s.target), Some(1));
    }
}
