//! Per-channel sample storage handed between the capture and draw cadences.

use crate::error::ConfigError;

/// One set of per-channel sample windows backed by a single allocation.
///
/// Channel `i` occupies `data[i * sample_size..(i + 1) * sample_size]`; the
/// per-channel slices returned by [`ChannelBuffers::channel`] are views into
/// that allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBuffers {
    data: Vec<f32>,
    channels: usize,
    sample_size: usize,
}

impl ChannelBuffers {
    pub fn new(channels: usize, sample_size: usize) -> Result<Self, ConfigError> {
        if channels == 0 {
            return Err(ConfigError::NoChannels);
        }
        if sample_size == 0 {
            return Err(ConfigError::EmptySampleWindow);
        }

        Ok(Self {
            data: vec![0.0; channels * sample_size],
            channels,
            sample_size,
        })
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn same_shape(&self, other: &ChannelBuffers) -> bool {
        self.channels == other.channels && self.sample_size == other.sample_size
    }

    #[inline]
    pub fn channel(&self, idx: usize) -> &[f32] {
        let start = idx * self.sample_size;
        &self.data[start..start + self.sample_size]
    }

    #[inline]
    pub fn channel_mut(&mut self, idx: usize) -> &mut [f32] {
        let start = idx * self.sample_size;
        &mut self.data[start..start + self.sample_size]
    }

    pub fn iter(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.sample_size)
    }

    pub fn iter_mut(&mut self) -> std::slice::ChunksExactMut<'_, f32> {
        self.data.chunks_exact_mut(self.sample_size)
    }

    pub fn zero(&mut self) {
        self.data.fill(0.0);
    }

    /// Bulk copy from a buffer set of identical shape.
    ///
    /// # Panics
    ///
    /// Panics when the shapes differ; buffers are allocated together for one
    /// session and a mismatch means two sessions are sharing state.
    pub fn copy_from(&mut self, other: &ChannelBuffers) {
        assert!(
            self.same_shape(other),
            "channel buffer shape mismatch: {}x{} <- {}x{}",
            self.channels,
            self.sample_size,
            other.channels,
            other.sample_size
        );
        self.data.copy_from_slice(&other.data);
    }

    /// De-interleaves frame-ordered samples (`L R L R ...`) into the channel
    /// views. A short packet leaves the tail of every channel silent; extra
    /// frames are ignored. Returns the number of frames consumed.
    pub fn fill_from_interleaved(&mut self, samples: &[f32]) -> usize {
        let channels = self.channels;
        let frames = (samples.len() / channels).min(self.sample_size);

        for (frame_idx, frame) in samples.chunks_exact(channels).take(frames).enumerate() {
            for (channel, &sample) in frame.iter().enumerate() {
                self.data[channel * self.sample_size + frame_idx] = sample;
            }
        }

        if frames < self.sample_size {
            for channel in self.iter_mut() {
                channel[frames..].fill(0.0);
            }
        }

        frames
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    /// Filled from the capture callback.
    Write,
    /// Consumed by the processing cadence.
    Read,
}

/// The read/write pair. No internal locking: the pipeline coordinator owns
/// both sets and serialises access through its lock.
#[derive(Debug, Clone)]
pub struct SampleChannelBuffers {
    read: ChannelBuffers,
    write: ChannelBuffers,
}

impl SampleChannelBuffers {
    pub fn allocate(channels: usize, sample_size: usize) -> Result<Self, ConfigError> {
        let write = ChannelBuffers::new(channels, sample_size)?;
        Ok(Self {
            read: write.clone(),
            write,
        })
    }

    pub fn channels(&self) -> usize {
        self.write.channels()
    }

    pub fn sample_size(&self) -> usize {
        self.write.sample_size()
    }

    pub fn get(&self, role: BufferRole) -> &ChannelBuffers {
        match role {
            BufferRole::Read => &self.read,
            BufferRole::Write => &self.write,
        }
    }

    pub fn get_mut(&mut self, role: BufferRole) -> &mut ChannelBuffers {
        match role {
            BufferRole::Read => &mut self.read,
            BufferRole::Write => &mut self.write,
        }
    }

    pub fn read(&self) -> &ChannelBuffers {
        &self.read
    }

    pub fn read_mut(&mut self) -> &mut ChannelBuffers {
        &mut self.read
    }

    pub fn write(&self) -> &ChannelBuffers {
        &self.write
    }

    pub fn write_mut(&mut self) -> &mut ChannelBuffers {
        &mut self.write
    }

    pub fn zero(&mut self, role: BufferRole) {
        self.get_mut(role).zero();
    }

    /// Copies one set onto the other. Never allocates or blocks.
    pub fn copy(&mut self, from: BufferRole, to: BufferRole) {
        match (from, to) {
            (BufferRole::Write, BufferRole::Read) => self.read.copy_from(&self.write),
            (BufferRole::Read, BufferRole::Write) => self.write.copy_from(&self.read),
            _ => {}
        }
    }
}
