use std::ops::RangeInclusive;
use tracing::debug;

/// Splits an inclusive block range into ascending sub-ranges of at most
/// `batch_size` blocks.
///
/// Ranges are produced lazily and cover `start..=end` exactly once. An empty
/// range (`start > end`) yields nothing.
#[derive(Debug, Clone)]
pub struct BatchPlanner {
    current: u64,
    end: u64,
    batch_size: u64,
    batch_count: u64,
    total_batches: u64,
}

impl BatchPlanner {
    /// A `batch_size` of zero is treated as one.
    pub fn new(start: u64, end: u64, batch_size: u64) -> Self {
        let batch_size = batch_size.max(1);
        let total_batches = if start > end {
            0
        } else {
            ((end - start) / batch_size).saturating_add(1)
        };
        Self {
            current: start,
            end,
            batch_size,
            batch_count: 0,
            total_batches,
        }
    }

    pub fn total_batches(&self) -> u64 {
        self.total_batches
    }
}

impl Iterator for BatchPlanner {
    type Item = RangeInclusive<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.batch_count >= self.total_batches {
            return None;
        }

        self.batch_count += 1;
        if self.batch_count % 10 == 0 {
            debug!(batch_count = self.batch_count, total = self.total_batches, "Planned batches");
        }

        let batch_start = self.current;
        let batch_end = batch_start.saturating_add(self.batch_size - 1).min(self.end);
        self.current = batch_end.saturating_add(1);

        Some(batch_start..=batch_end)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.total_batches - self.batch_count) {
            Ok(remaining) => (remaining, Some(remaining)),
            Err(_) => (usize::MAX, None),
        }
    }
}
