//! Fixed-capacity ring buffer of multi-channel EEG samples
//!
//! The buffer only stores and windows samples. It is not synchronised; a
//! session owns exactly one and drives it from a single task.

use std::collections::VecDeque;

use venturi_core::types::EegSample;

use crate::error::{BufferError, BufferResult};

/// Ring buffer holding the most recent samples of one session
#[derive(Clone, Debug)]
pub struct SignalBuffer {
    samples: VecDeque<EegSample>,
    capacity: usize,
    channel_count: usize,
    total_pushed: u64,
}

/// Receipt for a push, used to undo it when the cycle that follows fails
#[derive(Debug)]
#[must_use]
pub struct PushReceipt {
    evicted: Option<EegSample>,
}

impl SignalBuffer {
    /// Create an empty buffer
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum samples retained (at least 1)
    /// * `channel_count` - Channels every sample must carry
    #[must_use]
    pub fn new(capacity: usize, channel_count: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            channel_count,
            total_pushed: 0,
        }
    }

    /// Append a sample, overwriting the oldest one when full
    ///
    /// # Errors
    ///
    /// Returns `BufferError::ChannelMismatch` if the sample shape differs from
    /// the buffer's; the buffer is unchanged in that case.
    pub fn push(&mut self, sample: EegSample) -> BufferResult<PushReceipt> {
        if sample.channel_count() != self.channel_count {
            return Err(BufferError::ChannelMismatch {
                expected: self.channel_count,
                got: sample.channel_count(),
            });
        }

        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        self.total_pushed += 1;

        Ok(PushReceipt { evicted })
    }

    /// Undo the most recent push, restoring any sample it evicted
    pub fn undo_push(&mut self, receipt: PushReceipt) {
        if self.samples.pop_back().is_some() {
            self.total_pushed -= 1;
        }
        if let Some(evicted) = receipt.evicted {
            self.samples.push_front(evicted);
        }
    }

    /// Most recent `len` samples, oldest first
    ///
    /// # Errors
    ///
    /// Returns `BufferError::InsufficientData` if fewer than `len` samples are
    /// buffered.
    pub fn window(&self, len: usize) -> BufferResult<Window<'_>> {
        if len == 0 || self.samples.len() < len {
            return Err(BufferError::InsufficientData {
                available: self.samples.len(),
                required: len,
            });
        }

        let skip = self.samples.len() - len;
        let (head, tail) = self.samples.as_slices();
        let (head, tail) = if skip < head.len() {
            (&head[skip..], tail)
        } else {
            (&tail[skip - head.len()..], &tail[..0])
        };

        Ok(Window { head, tail, channel_count: self.channel_count })
    }

    /// Samples currently held
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no sample has been retained yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum samples retained
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Channels per sample
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Samples accepted since the buffer was created
    #[must_use]
    pub fn total_pushed(&self) -> u64 {
        self.total_pushed
    }
}

/// Read-only view over the most recent samples of a [`SignalBuffer`]
#[derive(Clone, Copy, Debug)]
pub struct Window<'a> {
    head: &'a [EegSample],
    tail: &'a [EegSample],
    channel_count: usize,
}

impl<'a> Window<'a> {
    /// Build a window over a contiguous slice of samples
    #[must_use]
    pub fn from_slice(samples: &'a [EegSample], channel_count: usize) -> Self {
        Self { head: samples, tail: &samples[..0], channel_count }
    }

    /// Samples in the window
    #[must_use]
    pub fn len(&self) -> usize {
        self.head.len() + self.tail.len()
    }

    /// Whether the window is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Channels per sample
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Iterate samples, oldest first
    pub fn iter(self) -> impl Iterator<Item = &'a EegSample> + 'a {
        self.head.iter().chain(self.tail.iter())
    }

    /// Iterate one channel's values, oldest first
    pub fn channel(self, index: usize) -> impl Iterator<Item = f64> + 'a {
        self.iter().map(move |s| s.channel(index).unwrap_or(0.0))
    }

    /// Oldest sample
    #[must_use]
    pub fn first(self) -> Option<&'a EegSample> {
        self.head.first().or_else(|| self.tail.first())
    }

    /// Newest sample
    #[must_use]
    pub fn last(self) -> Option<&'a EegSample> {
        self.tail.last().or_else(|| self.head.last())
    }

    /// Time covered from first to last sample, in microseconds
    #[must_use]
    pub fn span_us(self) -> u64 {
        match (self.first(), self.last()) {
            (Some(a), Some(b)) => b.timestamp_us().saturating_sub(a.timestamp_us()),
            _ => 0,
        }
    }
}
