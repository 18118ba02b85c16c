//! Linear uniform data stream.
//!
//! Per-frame parameters are appended to a host-side staging window with
//! explicit alignment, then uploaded to a single `wgpu::Buffer`. Consumers
//! bind a sub-range of that buffer at a fixed group index:
//!
//! | group | stream | contents                                        |
//! |-------|--------|-------------------------------------------------|
//! | 0     | global | camera position, render flags, light array      |
//! | 1     | local  | one record per entity and per light proxy       |
//!
//! A region written during frame N is stamped with N and is stale as soon
//! as the stream is mapped again.

use glam::{Mat4, Vec3};

/// A byte range written into a stream during one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRegion {
    pub frame: u64,
    pub offset: u32,
    pub size: u32,
}

/// Host staging memory for one uniform buffer.
#[derive(Debug)]
pub struct UniformStream {
    bytes: Vec<u8>,
    head: usize,
    frame: u64,
}

impl UniformStream {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
            head: 0,
            frame: 0,
        }
    }

    /// Opens the write window for a new frame.
    ///
    /// Resets the head and invalidates every region handed out before.
    /// Dropping the returned writer closes the window.
    pub fn map(&mut self) -> StreamWriter<'_> {
        self.frame += 1;
        self.head = 0;
        StreamWriter { stream: self }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn head(&self) -> usize {
        self.head
    }

    /// Frame number of the most recent map. Zero before the first map.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Bytes written since the last map, padded to the copy alignment.
    pub fn written(&self) -> &[u8] {
        let end = self
            .head
            .next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize)
            .min(self.bytes.len());
        &self.bytes[..end]
    }

    /// True when `region` was produced by the current frame's map.
    pub fn is_current(&self, region: &FrameRegion) -> bool {
        region.frame == self.frame
    }
}

/// Scoped write access to a [`UniformStream`].
pub struct StreamWriter<'a> {
    stream: &'a mut UniformStream,
}

impl StreamWriter<'_> {
    fn push_bytes(&mut self, data: &[u8]) {
        let start = self.stream.head;
        let end = start + data.len();
        assert!(
            end <= self.stream.capacity(),
            "uniform stream overflow: {} bytes written past capacity {}",
            end - self.stream.capacity(),
            self.stream.capacity()
        );
        self.stream.bytes[start..end].copy_from_slice(data);
        self.stream.head = end;
    }

    pub fn push_u32(&mut self, value: u32) {
        self.push_bytes(bytemuck::bytes_of(&value));
    }

    pub fn push_f32(&mut self, value: f32) {
        self.push_bytes(bytemuck::bytes_of(&value));
    }

    pub fn push_vec3(&mut self, value: Vec3) {
        self.push_bytes(bytemuck::bytes_of(&value.to_array()));
    }

    /// Pushes a column-major 4x4 matrix.
    pub fn push_mat4(&mut self, value: &Mat4) {
        self.push_bytes(bytemuck::bytes_of(&value.to_cols_array()));
    }

    /// Advances the head to the next multiple of `alignment`.
    pub fn align_head(&mut self, alignment: usize) {
        assert!(alignment > 0, "alignment must be nonzero");
        let aligned = self.stream.head.next_multiple_of(alignment);
        assert!(
            aligned <= self.stream.capacity(),
            "uniform stream overflow while aligning to {alignment}"
        );
        self.stream.bytes[self.stream.head..aligned].fill(0);
        self.stream.head = aligned;
    }

    pub fn head(&self) -> usize {
        self.stream.head
    }

    pub fn frame(&self) -> u64 {
        self.stream.frame
    }

    /// The region from `start` to the current head, stamped with this frame.
    pub fn region_since(&self, start: usize) -> FrameRegion {
        FrameRegion {
            frame: self.stream.frame,
            offset: start as u32,
            size: (self.stream.head - start) as u32,
        }
    }
}

/// A GPU uniform buffer fed by a [`UniformStream`].
pub struct UniformBuffer {
    buffer: wgpu::Buffer,
    stream: UniformStream,
}

impl UniformBuffer {
    pub fn new(device: &wgpu::Device, label: &str, capacity: u32) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        log::debug!("Created uniform buffer '{label}' ({capacity} bytes)");
        Self {
            buffer,
            stream: UniformStream::new(capacity as usize),
        }
    }

    /// Maps the stream, runs `fill`, unmaps and uploads what was written.
    ///
    /// The upload lands on the queue ahead of any command buffer submitted
    /// afterwards, so draws recorded later in the frame see the new data.
    pub fn write<R>(&mut self, queue: &wgpu::Queue, fill: impl FnOnce(&mut StreamWriter<'_>) -> R) -> R {
        let result = {
            let mut writer = self.stream.map();
            fill(&mut writer)
        };
        let written = self.stream.written();
        if !written.is_empty() {
            queue.write_buffer(&self.buffer, 0, written);
        }
        result
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn stream(&self) -> &UniformStream {
        &self.stream
    }
}
