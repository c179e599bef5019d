// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fixed-capacity FIFO window for numerical samples.

/// A fixed-size circular buffer. Once full, each push evicts the oldest value.
#[derive(Debug, Clone)]
pub struct RingBuffer<T, const N: usize> {
    data: [T; N],
    index: usize,
    count: usize,
}

impl<T: Default + Copy, const N: usize> RingBuffer<T, N> {
    /// Creates a new, empty ring buffer.
    pub fn new() -> Self {
        Self {
            data: [T::default(); N],
            index: 0,
            count: 0,
        }
    }

    /// Pushes a new value into the buffer, overwriting the oldest if full.
    pub fn push(&mut self, value: T) {
        self.data[self.index] = value;
        self.index = (self.index + 1) % N;
        if self.count < N {
            self.count += 1;
        }
    }

    /// Removes every value.
    pub fn clear(&mut self) {
        self.index = 0;
        self.count = 0;
    }

    /// Returns the number of elements currently in the buffer.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns `true` if the buffer holds no values.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the fixed capacity `N`.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Returns an iterator over the values in chronological order (oldest to newest).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (left, right) = self.data.split_at(self.index);
        if self.count < N {
            // Not full yet: the values live in [0, index).
            right[N - self.index..]
                .iter()
                .chain(left[..self.index].iter())
        } else {
            // Full: the oldest value sits at the current index.
            right.iter().chain(left.iter())
        }
    }

    /// Returns the most recently pushed value.
    pub fn last(&self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        Some(self.data[(self.index + N - 1) % N])
    }
}

impl<T: Default + Copy, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<f32, N> {
    /// Arithmetic mean of the values, or `0.0` when empty.
    pub fn mean(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        (self.iter().map(|&v| v as f64).sum::<f64>() / self.count as f64) as f32
    }

    /// Population variance (divides by `n`) of the values, or `0.0` with fewer than two samples.
    pub fn variance(&self) -> f32 {
        if self.count < 2 {
            return 0.0;
        }
        let n = self.count as f64;
        let mean = self.iter().map(|&v| v as f64).sum::<f64>() / n;
        let sum_sq: f64 = self
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum();
        (sum_sq / n) as f32
    }

    /// Population standard deviation of the values.
    pub fn std_dev(&self) -> f32 {
        self.variance().max(0.0).sqrt()
    }
}
