//! Sample type and the immutable sample arena

use std::sync::Arc;

/// Audio sample type (always f64 for maximum precision)
pub type Sample = f64;

/// Immutable, shareable buffer of samples.
///
/// The raw signal is never modified after construction; repairs live in
/// patch layers stacked on top of it. Clones share the same storage, so
/// handing a buffer to worker threads is cheap.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Arc<[Sample]>,
}

impl SampleBuffer {
    /// Wrap raw samples into an immutable buffer
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample at `pos`, or `None` past the end
    pub fn get(&self, pos: usize) -> Option<Sample> {
        self.samples.get(pos).copied()
    }

    /// The full sample span
    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }
}

impl From<Vec<Sample>> for SampleBuffer {
    fn from(samples: Vec<Sample>) -> Self {
        Self::new(samples)
    }
}

impl From<&[Sample]> for SampleBuffer {
    fn from(samples: &[Sample]) -> Self {
        Self::new(samples.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_access() {
        let buf = SampleBuffer::new(vec![0.1, 0.2, 0.3]);
        assert_eq!(buf.len(), 3);
        assert!(!buf.is_empty());
        assert_eq!(buf.get(1), Some(0.2));
        assert_eq!(buf.get(3), None);
    }

    #[test]
    fn test_clones_share_storage() {
        let buf = SampleBuffer::new(vec![1.0; 1024]);
        let other = buf.clone();
        assert_eq!(buf.as_slice().as_ptr(), other.as_slice().as_ptr());
    }

    #[test]
    fn test_empty_buffer() {
        let buf = SampleBuffer::new(Vec::new());
        assert!(buf.is_empty());
        assert_eq!(buf.get(0), None);
    }
}
