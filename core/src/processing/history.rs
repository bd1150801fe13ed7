use crate::processing::sample::ScanPoint;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Bounded FIFO of recent scan points.
///
/// One writer pushes while readers take owned snapshots; the lock is held only
/// for the push or the copy, so a reader never sees a half-applied update.
#[derive(Debug)]
pub struct SampleHistory {
    points: Mutex<VecDeque<ScanPoint>>,
    capacity: usize,
}

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

impl SampleHistory {
    /// Creates an empty history; a zero capacity is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ScanPoint>> {
        self.points.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a point, evicting the oldest one when full.
    pub fn push(&self, point: ScanPoint) {
        let mut points = self.lock();
        if points.len() == self.capacity {
            points.pop_front();
        }
        points.push_back(point);
    }

    /// Oldest-first copy of the current contents.
    pub fn snapshot(&self) -> Vec<ScanPoint> {
        self.lock().iter().copied().collect()
    }

    pub fn latest(&self) -> Option<ScanPoint> {
        self.lock().back().copied()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for SampleHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::sample::{Angle, Distance};
    use std::sync::Arc;
    use std::thread;

    fn point(i: usize) -> ScanPoint {
        ScanPoint::new(Angle::new((i % 19 * 10) as i32), Distance::from_cm(i as f32))
            .with_pass(i as u64)
    }

    #[test]
    fn overflow_keeps_most_recent_in_order() {
        let history = SampleHistory::with_capacity(5);
        for i in 0..8 {
            history.push(point(i));
        }

        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), 5);
        let passes: Vec<u64> = snapshot.iter().map(|p| p.pass).collect();
        assert_eq!(passes, vec![3, 4, 5, 6, 7]);
        assert_eq!(history.latest().map(|p| p.pass), Some(7));
    }

    #[test]
    fn snapshot_length_is_min_of_pushes_and_capacity() {
        for pushes in [0usize, 3, 50, 51, 120] {
            let history = SampleHistory::default();
            for i in 0..pushes {
                history.push(point(i));
            }
            assert_eq!(history.snapshot().len(), pushes.min(50));
        }
    }

    #[test]
    fn concurrent_reader_sees_whole_snapshots() {
        let history = Arc::new(SampleHistory::with_capacity(16));
        let writer = {
            let history = Arc::clone(&history);
            thread::spawn(move || {
                for i in 0..2_000 {
                    history.push(point(i));
                }
            })
        };

        for _ in 0..200 {
            let snapshot = history.snapshot();
            assert!(snapshot.len() <= 16);
            assert!(snapshot.windows(2).all(|w| w[1].pass == w[0].pass + 1));
        }
        writer.join().unwrap();
        assert_eq!(history.len(), 16);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let history = SampleHistory::with_capacity(0);
        history.push(point(1));
        history.push(point(2));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.snapshot(), vec![point(2)]);
    }
}
