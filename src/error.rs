//! Error types shared across the renderer.
//!
//! Resource-build failures ([`FramebufferStatus`], shader compilation) are
//! logged and never abort a frame. Setup failures ([`GpuError`],
//! [`ConfigError`]) propagate to the binary. Asset failures ([`AssetError`])
//! are returned to the caller, which falls back to a default resource.

use std::path::PathBuf;

/// Why a render target group failed its completeness check.
///
/// Mirrors the classic framebuffer-completeness reasons, evaluated against
/// the attachment images and the device limits.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatus {
    /// The group has a zero-sized extent.
    #[error("framebuffer undefined: zero-sized target")]
    Undefined,
    /// An attachment does not match the group's dimensions.
    #[error("incomplete attachment: image size differs from the target size")]
    IncompleteAttachment,
    /// A role defined by the variant has no image.
    #[error("incomplete missing attachment")]
    MissingAttachment,
    /// A draw target is not colour-renderable.
    #[error("incomplete draw buffer: attachment cannot be rendered to")]
    IncompleteDrawBuffer,
    /// A role read by later passes cannot be sampled.
    #[error("incomplete read buffer: attachment cannot be sampled")]
    IncompleteReadBuffer,
    /// The attachment combination exceeds what the device supports.
    #[error("unsupported attachment combination")]
    Unsupported,
    /// Attachments disagree on sample count.
    #[error("incomplete multisample: sample counts differ")]
    IncompleteMultisample,
    /// Attachments disagree on layer count.
    #[error("incomplete layer targets: layer counts differ")]
    IncompleteLayerTargets,
}

/// Failures while bringing up the GPU.
#[derive(thiserror::Error, Debug)]
pub enum GpuError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

/// Failures while loading assets into the catalog.
#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    #[error("texture not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Failures while loading the viewer configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
