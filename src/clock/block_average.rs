/// Window length used by the averaged measurer.
pub const BLOCK_SIZE: usize = 64;

/// Sliding window of the last `N` interval samples with a running sum.
///
/// The mean is only reported once the window is full so a half-filled
/// buffer never skews the result.
#[derive(Debug, Clone)]
pub struct BlockAverage<const N: usize = BLOCK_SIZE> {
    samples: [u32; N],
    sum: u64,
    next: usize,
    count: usize,
}

impl<const N: usize> BlockAverage<N> {
    pub fn new() -> Self {
        Self {
            samples: [0; N],
            sum: 0,
            next: 0,
            count: 0,
        }
    }

    /// Adds a sample, evicting the oldest once the window is full.
    pub fn push(&mut self, sample: u32) {
        if N == 0 {
            return;
        }
        if self.count == N {
            self.sum -= u64::from(self.samples[self.next]);
        } else {
            self.count += 1;
        }
        self.samples[self.next] = sample;
        self.sum += u64::from(sample);
        self.next = (self.next + 1) % N;
    }

    /// Truncated mean of the window, `None` until `N` samples have arrived.
    pub fn average(&self) -> Option<u32> {
        if N == 0 || self.count < N {
            return None;
        }
        u32::try_from(self.sum / N as u64).ok()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        N > 0 && self.count == N
    }

    pub fn clear(&mut self) {
        self.samples = [0; N];
        self.sum = 0;
        self.next = 0;
        self.count = 0;
    }
}

impl<const N: usize> Default for BlockAverage<N> {
    fn default() -> Self {
        Self::new()
    }
}
