//! Render target groups: the frame buffers of the deferred pipeline.
//!
//! A [`RenderTargetGroup`] owns an [`AttachmentSet`] and knows which of its
//! images are drawn to together. The variant set is closed:
//!
//! | kind       | draw targets                                  | depth    |
//! |------------|-----------------------------------------------|----------|
//! | `Geometry` | GPosition, GNormal, GAlbedo, Color, Depth     | ZBuffer  |
//! | `Shading`  | Color, Bright                                 | ZBuffer  |
//! | `PingPong` | Blurred *or* BlurScratch (one at a time)      | none     |
//!
//! Resizing reallocates every image at the new size but never changes which
//! roles exist. After every (re)allocation the group validates itself and
//! logs a [`FramebufferStatus`] on failure; rendering continues either way.

use crate::attachment::{
    AttachmentAllocator, AttachmentDesc, AttachmentImage, AttachmentLimits, AttachmentRole,
    AttachmentSet, GpuImage, ImageHandle,
};
use crate::error::FramebufferStatus;

/// Background colour used when a group clears its `Color` attachment.
pub const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.1,
    b: 0.1,
    a: 1.0,
};

/// Format of every hardware depth buffer. Copyable between groups.
pub const ZBUFFER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Format of HDR colour attachments (lit colour, bright pass, blur targets).
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

const SAMPLED: wgpu::TextureUsages =
    wgpu::TextureUsages::RENDER_ATTACHMENT.union(wgpu::TextureUsages::TEXTURE_BINDING);
const DEPTH: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
    .union(wgpu::TextureUsages::COPY_SRC)
    .union(wgpu::TextureUsages::COPY_DST);

const fn attachment(
    label: &'static str,
    role: AttachmentRole,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> AttachmentDesc {
    AttachmentDesc {
        label,
        role,
        format,
        usage,
        width: 0,
        height: 0,
    }
}

const GEOMETRY_ATTACHMENTS: &[AttachmentDesc] = &[
    attachment("G-Buffer Position", AttachmentRole::GPosition, HDR_FORMAT, SAMPLED),
    attachment("G-Buffer Normal", AttachmentRole::GNormal, HDR_FORMAT, SAMPLED),
    attachment(
        "G-Buffer Albedo",
        AttachmentRole::GAlbedo,
        wgpu::TextureFormat::Rgba8Unorm,
        SAMPLED,
    ),
    attachment(
        "G-Buffer Color",
        AttachmentRole::Color,
        wgpu::TextureFormat::Rgba8Unorm,
        SAMPLED,
    ),
    attachment(
        "G-Buffer Depth",
        AttachmentRole::Depth,
        wgpu::TextureFormat::R32Float,
        SAMPLED,
    ),
    attachment("G-Buffer Z", AttachmentRole::ZBuffer, ZBUFFER_FORMAT, DEPTH),
];

const SHADING_ATTACHMENTS: &[AttachmentDesc] = &[
    attachment("Shading Color", AttachmentRole::Color, HDR_FORMAT, SAMPLED),
    attachment("Shading Bright", AttachmentRole::Bright, HDR_FORMAT, SAMPLED),
    attachment("Shading Z", AttachmentRole::ZBuffer, ZBUFFER_FORMAT, DEPTH),
];

const PING_PONG_ATTACHMENTS: &[AttachmentDesc] = &[
    attachment("Blur Target 0", AttachmentRole::Blurred, HDR_FORMAT, SAMPLED),
    attachment("Blur Target 1", AttachmentRole::BlurScratch, HDR_FORMAT, SAMPLED),
];

/// The fixed set of frame-buffer variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderTargetKind {
    Geometry,
    Shading,
    PingPong,
}

impl RenderTargetKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::Shading => "shading",
            Self::PingPong => "ping-pong",
        }
    }

    /// Every attachment this variant allocates.
    pub fn attachments(self) -> &'static [AttachmentDesc] {
        match self {
            Self::Geometry => GEOMETRY_ATTACHMENTS,
            Self::Shading => SHADING_ATTACHMENTS,
            Self::PingPong => PING_PONG_ATTACHMENTS,
        }
    }

    /// Colour roles bound together by one bind, in shader output order.
    ///
    /// Ping-pong groups bind one target at a time, so they expose two sets.
    pub fn draw_sets(self) -> &'static [&'static [AttachmentRole]] {
        use AttachmentRole::*;
        match self {
            Self::Geometry => &[&[GPosition, GNormal, GAlbedo, Color, Depth]],
            Self::Shading => &[&[Color, Bright]],
            Self::PingPong => &[&[Blurred], &[BlurScratch]],
        }
    }

    pub fn has_depth(self) -> bool {
        !matches!(self, Self::PingPong)
    }

    /// Formats of the colour targets of draw set `index`.
    pub fn target_formats(self, index: usize) -> Vec<wgpu::TextureFormat> {
        self.draw_sets()[index]
            .iter()
            .filter_map(|role| self.attachments().iter().find(|d| d.role == *role))
            .map(|d| d.format)
            .collect()
    }
}

/// A frame buffer: an attachment set plus the variant that drives it.
pub struct RenderTargetGroup<I> {
    kind: RenderTargetKind,
    attachments: AttachmentSet<I>,
    status: Result<(), FramebufferStatus>,
}

impl<I: AttachmentImage> RenderTargetGroup<I> {
    /// Allocates every attachment of `kind` at `width` x `height`.
    pub fn new<A>(kind: RenderTargetKind, allocator: &A, width: u32, height: u32) -> Self
    where
        A: AttachmentAllocator<Image = I>,
    {
        let mut group = Self {
            kind,
            attachments: AttachmentSet::new(),
            status: Ok(()),
        };
        group.reserve(allocator, width, height);
        group.rebuild(allocator.limits());
        group
    }

    /// Reallocates every attachment at the new size.
    ///
    /// Must run whenever the display size changes and before the next bind.
    pub fn resize<A>(&mut self, allocator: &A, width: u32, height: u32)
    where
        A: AttachmentAllocator<Image = I>,
    {
        log::debug!(
            "Resizing {} target {}x{} -> {}x{}",
            self.kind.label(),
            self.width(),
            self.height(),
            width,
            height
        );
        self.free();
        self.reserve(allocator, width, height);
        self.rebuild(allocator.limits());
    }

    fn reserve<A>(&mut self, allocator: &A, width: u32, height: u32)
    where
        A: AttachmentAllocator<Image = I>,
    {
        self.attachments
            .allocate(allocator, self.kind.attachments(), width, height);
    }

    /// Releases every attachment image.
    pub fn free(&mut self) {
        self.attachments.release();
    }

    fn rebuild(&mut self, limits: AttachmentLimits) {
        self.status = check_completeness(self.kind, &self.attachments, limits);
        match self.status {
            Ok(()) => log::debug!(
                "{} target complete at {}x{}",
                self.kind.label(),
                self.width(),
                self.height()
            ),
            Err(status) => log::error!("{} target incomplete: {}", self.kind.label(), status),
        }
    }

    pub fn kind(&self) -> RenderTargetKind {
        self.kind
    }

    /// Result of the last completeness check.
    pub fn status(&self) -> Result<(), FramebufferStatus> {
        self.status
    }

    /// The image bound to `role`, or `None` when this variant has no such role.
    pub fn texture(&self, role: AttachmentRole) -> Option<&I> {
        self.attachments.get(role)
    }

    pub fn handle(&self, role: AttachmentRole) -> Option<ImageHandle> {
        self.attachments.handle(role)
    }

    pub fn width(&self) -> u32 {
        self.attachments.width()
    }

    pub fn height(&self) -> u32 {
        self.attachments.height()
    }
}

impl RenderTargetGroup<GpuImage> {
    /// Begins a render pass drawing into all of this group's targets.
    ///
    /// With `clear`, the `Color` role clears to [`BACKGROUND`], data roles
    /// to zero and the depth buffer to 1.0; otherwise contents are loaded.
    /// Dropping the returned pass unbinds the group.
    pub fn bind<'e>(&self, encoder: &'e mut wgpu::CommandEncoder, clear: bool) -> wgpu::RenderPass<'e> {
        self.bind_target(encoder, 0, clear)
    }

    /// Begins a render pass on draw set `index` (ping-pong target 0 or 1).
    pub fn bind_target<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        index: usize,
        clear: bool,
    ) -> wgpu::RenderPass<'e> {
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = self.kind
            .draw_sets()[index]
            .iter()
            .map(|role| {
                self.texture(*role).map(|image| wgpu::RenderPassColorAttachment {
                    view: &image.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: if clear {
                            wgpu::LoadOp::Clear(clear_color(*role))
                        } else {
                            wgpu::LoadOp::Load
                        },
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })
            })
            .collect();

        let depth_stencil_attachment = self.texture(AttachmentRole::ZBuffer).map(|image| {
            wgpu::RenderPassDepthStencilAttachment {
                view: &image.view,
                depth_ops: Some(wgpu::Operations {
                    load: if clear {
                        wgpu::LoadOp::Clear(1.0)
                    } else {
                        wgpu::LoadOp::Load
                    },
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }
        });

        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(self.kind.label()),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }

    /// The texture view bound to `role`, if the variant defines it.
    pub fn view(&self, role: AttachmentRole) -> Option<&wgpu::TextureView> {
        self.texture(role).map(|image| &image.view)
    }
}

fn clear_color(role: AttachmentRole) -> wgpu::Color {
    match role {
        AttachmentRole::Color => BACKGROUND,
        _ => wgpu::Color::TRANSPARENT,
    }
}

/// Validates an attachment set against its variant and the device limits.
pub fn check_completeness<I: AttachmentImage>(
    kind: RenderTargetKind,
    set: &AttachmentSet<I>,
    limits: AttachmentLimits,
) -> Result<(), FramebufferStatus> {
    let (width, height) = (set.width(), set.height());
    if width == 0 || height == 0 {
        return Err(FramebufferStatus::Undefined);
    }

    let mut images = Vec::with_capacity(kind.attachments().len());
    for desc in kind.attachments() {
        let image = set
            .get(desc.role)
            .ok_or(FramebufferStatus::MissingAttachment)?;
        images.push((desc.role, image));
    }

    if images.iter().any(|(_, image)| image.size() != (width, height)) {
        return Err(FramebufferStatus::IncompleteAttachment);
    }

    for (role, image) in &images {
        let renderable = image.usage().contains(wgpu::TextureUsages::RENDER_ATTACHMENT);
        let depth = image.format().is_depth_stencil_format();
        if !renderable || depth != (*role == AttachmentRole::ZBuffer) {
            return Err(FramebufferStatus::IncompleteDrawBuffer);
        }
        if !depth && !image.usage().contains(wgpu::TextureUsages::TEXTURE_BINDING) {
            return Err(FramebufferStatus::IncompleteReadBuffer);
        }
    }

    if width > limits.max_dimension || height > limits.max_dimension {
        return Err(FramebufferStatus::Unsupported);
    }
    for draw_set in kind.draw_sets() {
        let mut bytes: u32 = 0;
        for role in *draw_set {
            let Some(image) = set.get(*role) else { continue };
            let format = image.format();
            let align = format.target_component_alignment().unwrap_or(1);
            bytes = bytes.div_ceil(align) * align + format.target_pixel_byte_cost().unwrap_or(0);
        }
        if bytes > limits.max_color_bytes_per_sample {
            return Err(FramebufferStatus::Unsupported);
        }
    }

    let samples = images[0].1.sample_count();
    if images.iter().any(|(_, image)| image.sample_count() != samples) {
        return Err(FramebufferStatus::IncompleteMultisample);
    }
    let layers = images[0].1.layer_count();
    if images.iter().any(|(_, image)| image.layer_count() != layers) {
        return Err(FramebufferStatus::IncompleteLayerTargets);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::testing::RecordingAllocator;

    fn roomy() -> RecordingAllocator {
        RecordingAllocator {
            limits: Some(AttachmentLimits {
                max_dimension: 8192,
                max_color_bytes_per_sample: 64,
            }),
            ..Default::default()
        }
    }

    const KINDS: [RenderTargetKind; 3] = [
        RenderTargetKind::Geometry,
        RenderTargetKind::Shading,
        RenderTargetKind::PingPong,
    ];

    #[test]
    fn every_defined_role_has_a_handle_after_initialize() {
        let alloc = roomy();
        for kind in KINDS {
            let group = RenderTargetGroup::new(kind, &alloc, 800, 600);
            assert_eq!(group.status(), Ok(()), "{kind:?}");
            for desc in kind.attachments() {
                assert!(group.handle(desc.role).is_some(), "{kind:?} {:?}", desc.role);
            }
        }
    }

    #[test]
    fn undefined_roles_return_none() {
        let alloc = roomy();
        let shading = RenderTargetGroup::new(RenderTargetKind::Shading, &alloc, 8, 8);
        assert!(shading.texture(AttachmentRole::GAlbedo).is_none());
        let blur = RenderTargetGroup::new(RenderTargetKind::PingPong, &alloc, 8, 8);
        assert!(blur.texture(AttachmentRole::ZBuffer).is_none());
    }

    #[test]
    fn resize_sequence_ends_at_last_size_with_same_roles() {
        let alloc = roomy();
        let mut group = RenderTargetGroup::new(RenderTargetKind::Geometry, &alloc, 640, 480);
        let before = group.handle(AttachmentRole::GAlbedo);

        for (w, h) in [(1024, 768), (300, 200), (1920, 1080)] {
            group.resize(&alloc, w, h);
        }

        assert_eq!((group.width(), group.height()), (1920, 1080));
        for desc in RenderTargetKind::Geometry.attachments() {
            let image = group.texture(desc.role).expect("role survives resize");
            assert_eq!(image.size(), (1920, 1080));
        }
        assert_ne!(group.handle(AttachmentRole::GAlbedo), before);
        assert_eq!(alloc.live(), RenderTargetKind::Geometry.attachments().len());
    }

    #[test]
    fn zero_size_is_undefined_but_not_fatal() {
        let alloc = roomy();
        let mut group = RenderTargetGroup::new(RenderTargetKind::Shading, &alloc, 0, 600);
        assert_eq!(group.status(), Err(FramebufferStatus::Undefined));

        group.resize(&alloc, 10, 10);
        assert_eq!(group.status(), Ok(()));
    }

    #[test]
    fn oversized_targets_are_unsupported() {
        let alloc = RecordingAllocator {
            limits: Some(AttachmentLimits {
                max_dimension: 100,
                max_color_bytes_per_sample: 64,
            }),
            ..Default::default()
        };
        let group = RenderTargetGroup::new(RenderTargetKind::PingPong, &alloc, 200, 50);
        assert_eq!(group.status(), Err(FramebufferStatus::Unsupported));
    }

    #[test]
    fn too_many_color_bytes_are_unsupported() {
        let alloc = RecordingAllocator {
            limits: Some(AttachmentLimits {
                max_dimension: 8192,
                max_color_bytes_per_sample: 16,
            }),
            ..Default::default()
        };
        let group = RenderTargetGroup::new(RenderTargetKind::Geometry, &alloc, 64, 64);
        assert_eq!(group.status(), Err(FramebufferStatus::Unsupported));
        // Ping-pong binds one 8-byte target at a time.
        let blur = RenderTargetGroup::new(RenderTargetKind::PingPong, &alloc, 64, 64);
        assert_eq!(blur.status(), Ok(()));
    }

    #[test]
    fn mismatched_sample_counts_are_reported() {
        let alloc = RecordingAllocator {
            multisampled_role: Some(AttachmentRole::Bright),
            ..roomy()
        };
        let group = RenderTargetGroup::new(RenderTargetKind::Shading, &alloc, 32, 32);
        assert_eq!(group.status(), Err(FramebufferStatus::IncompleteMultisample));
    }

    #[test]
    fn freed_group_reports_missing_attachments() {
        let alloc = roomy();
        let mut group = RenderTargetGroup::new(RenderTargetKind::Shading, &alloc, 32, 32);
        group.free();
        assert_eq!(alloc.live(), 0);
        assert_eq!(
            check_completeness(group.kind(), &group.attachments, alloc.limits()),
            Err(FramebufferStatus::MissingAttachment)
        );
    }

    #[test]
    fn target_formats_follow_draw_order() {
        assert_eq!(
            RenderTargetKind::Shading.target_formats(0),
            vec![HDR_FORMAT, HDR_FORMAT]
        );
        let geometry = RenderTargetKind::Geometry.target_formats(0);
        assert_eq!(geometry.len(), 5);
        assert_eq!(geometry[4], wgpu::TextureFormat::R32Float);
    }
}
