use std::collections::VecDeque;

/// Fixed-capacity ring of the most recent filtered samples for one
/// channel, with a stride counter gating overlapping window emission.
pub struct SlidingWindow {
    buf: VecDeque<f32>,
    capacity: usize,
    stride: usize,
    count: u64,
}

impl SlidingWindow {
    pub fn new(capacity: usize, stride: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            stride: stride.max(1),
            count: 0,
        }
    }

    /// Appends one sample, evicting the oldest at capacity. Returns true
    /// when a window snapshot is due: buffer full and the total sample
    /// count a multiple of the stride. The window keeps accumulating
    /// afterwards; emission never consumes it.
    pub fn push(&mut self, sample: f32) -> bool {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(sample);
        self.count += 1;
        self.buf.len() == self.capacity && self.count % self.stride as u64 == 0
    }

    /// Copies the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<f32> {
        self.buf.iter().copied().collect()
    }

    pub fn sample_count(&self) -> u64 {
        self.count
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    pub fn reset(&mut self) {
        self.buf.clear();
        self.count = 0;
    }
}
