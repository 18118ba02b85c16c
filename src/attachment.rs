//! Attachment images and the per-role attachment set.
//!
//! An [`AttachmentSet`] owns at most one image per [`AttachmentRole`]. It
//! only allocates, resizes and drops images; binding them as render targets
//! is the job of [`RenderTargetGroup`](crate::RenderTargetGroup).
//!
//! Images come from an [`AttachmentAllocator`]. The GPU implementation is
//! [`GpuContext`], which hands out [`GpuImage`]s owning a `wgpu::Texture`
//! and its view. Dropping an image releases its GPU memory exactly once.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::gpu::GpuContext;

const ROLE_COUNT: usize = 9;

/// Semantic role of an attachment image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttachmentRole {
    /// Lit (or preview) colour output.
    Color,
    /// Linear view depth stored as a colour image, readable by later passes.
    Depth,
    /// World-space position.
    GPosition,
    /// World-space normal.
    GNormal,
    /// Surface albedo.
    GAlbedo,
    /// Bright-pass output feeding the bloom blur.
    Bright,
    /// Ping-pong target 0; holds the final blurred image.
    Blurred,
    /// Ping-pong target 1.
    BlurScratch,
    /// Hardware depth buffer used for depth testing.
    ZBuffer,
}

impl AttachmentRole {
    /// Every role, in slot order.
    pub const ALL: [AttachmentRole; ROLE_COUNT] = [
        AttachmentRole::Color,
        AttachmentRole::Depth,
        AttachmentRole::GPosition,
        AttachmentRole::GNormal,
        AttachmentRole::GAlbedo,
        AttachmentRole::Bright,
        AttachmentRole::Blurred,
        AttachmentRole::BlurScratch,
        AttachmentRole::ZBuffer,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

/// Opaque, nonzero identifier of an allocated image.
///
/// Every allocation gets a fresh handle, so a handle observed before a
/// resize never compares equal to one observed after it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageHandle(NonZeroU32);

impl ImageHandle {
    /// Returns a handle that has never been returned before.
    pub fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        let id = NEXT.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU32::new(id).unwrap_or(NonZeroU32::MIN))
    }

    /// The raw identifier.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// Everything an allocator needs to create one attachment image.
#[derive(Clone, Debug)]
pub struct AttachmentDesc {
    pub label: &'static str,
    pub role: AttachmentRole,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
    pub width: u32,
    pub height: u32,
}

/// An allocated attachment image.
pub trait AttachmentImage {
    fn handle(&self) -> ImageHandle;
    fn size(&self) -> (u32, u32);
    fn format(&self) -> wgpu::TextureFormat;
    fn usage(&self) -> wgpu::TextureUsages;
    fn sample_count(&self) -> u32;
    fn layer_count(&self) -> u32;
}

/// Device limits relevant to attachment completeness.
#[derive(Clone, Copy, Debug)]
pub struct AttachmentLimits {
    pub max_dimension: u32,
    pub max_color_bytes_per_sample: u32,
}

impl Default for AttachmentLimits {
    fn default() -> Self {
        let limits = wgpu::Limits::default();
        Self {
            max_dimension: limits.max_texture_dimension_2d,
            max_color_bytes_per_sample: limits.max_color_attachment_bytes_per_sample,
        }
    }
}

/// Source of attachment images.
pub trait AttachmentAllocator {
    type Image: AttachmentImage;

    fn allocate(&self, desc: &AttachmentDesc) -> Self::Image;

    fn limits(&self) -> AttachmentLimits;
}

/// A GPU texture used as an attachment, with its default view.
#[derive(Debug)]
pub struct GpuImage {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    handle: ImageHandle,
}

impl AttachmentImage for GpuImage {
    fn handle(&self) -> ImageHandle {
        self.handle
    }

    fn size(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }

    fn format(&self) -> wgpu::TextureFormat {
        self.texture.format()
    }

    fn usage(&self) -> wgpu::TextureUsages {
        self.texture.usage()
    }

    fn sample_count(&self) -> u32 {
        self.texture.sample_count()
    }

    fn layer_count(&self) -> u32 {
        self.texture.depth_or_array_layers()
    }
}

impl AttachmentAllocator for GpuContext {
    type Image = GpuImage;

    fn allocate(&self, desc: &AttachmentDesc) -> GpuImage {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: desc.usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        GpuImage {
            texture,
            view,
            handle: ImageHandle::next(),
        }
    }

    fn limits(&self) -> AttachmentLimits {
        let limits = self.device.limits();
        AttachmentLimits {
            max_dimension: limits.max_texture_dimension_2d,
            max_color_bytes_per_sample: limits.max_color_attachment_bytes_per_sample,
        }
    }
}

/// One optional image per [`AttachmentRole`], plus the shared extent.
pub struct AttachmentSet<I> {
    width: u32,
    height: u32,
    images: [Option<I>; ROLE_COUNT],
}

impl<I: AttachmentImage> AttachmentSet<I> {
    /// An empty set with no images.
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            images: std::array::from_fn(|_| None),
        }
    }

    /// Allocates one image per description at `width` x `height`.
    ///
    /// Any previously held image is released before the first new
    /// allocation.
    pub fn allocate<A>(&mut self, allocator: &A, descs: &[AttachmentDesc], width: u32, height: u32)
    where
        A: AttachmentAllocator<Image = I>,
    {
        self.release();
        self.width = width;
        self.height = height;
        for desc in descs {
            let desc = AttachmentDesc {
                width,
                height,
                ..desc.clone()
            };
            self.images[desc.role.slot()] = Some(allocator.allocate(&desc));
        }
    }

    /// Drops every image. Roles become unallocated.
    pub fn release(&mut self) {
        for image in &mut self.images {
            *image = None;
        }
    }

    pub fn get(&self, role: AttachmentRole) -> Option<&I> {
        self.images[role.slot()].as_ref()
    }

    pub fn handle(&self, role: AttachmentRole) -> Option<ImageHandle> {
        self.get(role).map(AttachmentImage::handle)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl<I: AttachmentImage> Default for AttachmentSet<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// A recording allocator for exercising attachment logic without a GPU.
#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Event {
        Alloc(ImageHandle, AttachmentRole),
        Free(ImageHandle),
    }

    #[derive(Debug)]
    pub struct FakeImage {
        handle: ImageHandle,
        desc: AttachmentDesc,
        sample_count: u32,
        log: Rc<RefCell<Vec<Event>>>,
    }

    impl AttachmentImage for FakeImage {
        fn handle(&self) -> ImageHandle {
            self.handle
        }

        fn size(&self) -> (u32, u32) {
            (self.desc.width, self.desc.height)
        }

        fn format(&self) -> wgpu::TextureFormat {
            self.desc.format
        }

        fn usage(&self) -> wgpu::TextureUsages {
            self.desc.usage
        }

        fn sample_count(&self) -> u32 {
            self.sample_count
        }

        fn layer_count(&self) -> u32 {
            1
        }
    }

    impl Drop for FakeImage {
        fn drop(&mut self) {
            self.log.borrow_mut().push(Event::Free(self.handle));
        }
    }

    /// Allocator that logs every allocation and release.
    #[derive(Default)]
    pub struct RecordingAllocator {
        pub log: Rc<RefCell<Vec<Event>>>,
        pub limits: Option<AttachmentLimits>,
        /// Role whose image is created with 4 samples.
        pub multisampled_role: Option<AttachmentRole>,
    }

    impl RecordingAllocator {
        pub fn events(&self) -> Vec<Event> {
            self.log.borrow().clone()
        }

        pub fn live(&self) -> usize {
            let log = self.log.borrow();
            let allocs = log.iter().filter(|e| matches!(e, Event::Alloc(..))).count();
            allocs - (log.len() - allocs)
        }
    }

    impl AttachmentAllocator for RecordingAllocator {
        type Image = FakeImage;

        fn allocate(&self, desc: &AttachmentDesc) -> FakeImage {
            let handle = ImageHandle::next();
            self.log.borrow_mut().push(Event::Alloc(handle, desc.role));
            FakeImage {
                handle,
                desc: desc.clone(),
                sample_count: if self.multisampled_role == Some(desc.role) {
                    4
                } else {
                    1
                },
                log: Rc::clone(&self.log),
            }
        }

        fn limits(&self) -> AttachmentLimits {
            self.limits.unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Event, RecordingAllocator};
    use super::*;

    fn desc(role: AttachmentRole) -> AttachmentDesc {
        AttachmentDesc {
            label: "test",
            role,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            width: 0,
            height: 0,
        }
    }

    #[test]
    fn handles_are_unique_and_nonzero() {
        let a = ImageHandle::next();
        let b = ImageHandle::next();
        assert_ne!(a, b);
        assert!(a.get() > 0 && b.get() > 0);
    }

    #[test]
    fn allocate_fills_only_requested_roles() {
        let alloc = RecordingAllocator::default();
        let mut set = AttachmentSet::new();
        set.allocate(
            &alloc,
            &[desc(AttachmentRole::Color), desc(AttachmentRole::Bright)],
            64,
            32,
        );

        assert!(set.handle(AttachmentRole::Color).is_some());
        assert!(set.handle(AttachmentRole::Bright).is_some());
        assert!(set.handle(AttachmentRole::GAlbedo).is_none());
        assert_eq!(set.get(AttachmentRole::Color).map(|i| i.size()), Some((64, 32)));
    }

    #[test]
    fn reallocation_frees_everything_first() {
        let alloc = RecordingAllocator::default();
        let mut set = AttachmentSet::new();
        let descs = [desc(AttachmentRole::Color), desc(AttachmentRole::ZBuffer)];
        set.allocate(&alloc, &descs, 10, 10);
        set.allocate(&alloc, &descs, 20, 20);

        let events = alloc.events();
        assert_eq!(events.len(), 6);
        assert!(matches!(events[2], Event::Free(_)));
        assert!(matches!(events[3], Event::Free(_)));
        assert!(matches!(events[4], Event::Alloc(..)));
        assert_eq!(alloc.live(), 2);
    }

    #[test]
    fn dropping_the_set_frees_each_image_once() {
        let alloc = RecordingAllocator::default();
        {
            let mut set = AttachmentSet::new();
            set.allocate(&alloc, &[desc(AttachmentRole::Depth)], 4, 4);
        }
        let frees = alloc
            .events()
            .iter()
            .filter(|e| matches!(e, Event::Free(_)))
            .count();
        assert_eq!(frees, 1);
        assert_eq!(alloc.live(), 0);
    }
}
