//! Sliding-window maximum.
//!
//! [`WindowEngine`] keeps a deque of candidates in descending value order;
//! equal values may queue behind each other. The front is the maximum of the
//! last `WINDOW_SIZE` items, and anything behind it may become the maximum
//! once the items ahead of it age out. Each item is pushed and popped at most
//! once, so `advance` runs in amortized O(1).

use crate::config::WindowSize;
use std::collections::VecDeque;

/// A value tagged with its arrival index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueItem {
    value: f64,
    index: u64,
}

impl ValueItem {
    pub fn new(value: f64, index: u64) -> Self {
        Self { value, index }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn index(&self) -> u64 {
        self.index
    }
}

/// How an incoming item relates to the current window candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// No candidates left
    Empty,
    /// At least as large as the front; every candidate is obsolete
    Dominates,
    /// Larger than the back; smaller candidates at the back are obsolete
    AboveBack,
    /// Not larger than the back; queued behind it
    BelowBack,
}

/// Sliding-window maximum over arrival-ordered items.
///
/// Not thread-safe by construction: it is owned by the consumer loop and
/// driven from a single thread.
#[derive(Debug, Clone)]
pub struct WindowEngine {
    size: WindowSize,
    window: VecDeque<ValueItem>,
}

impl WindowEngine {
    pub fn new(size: WindowSize) -> Self {
        let capacity = size.get().min(1024) as usize;
        Self {
            size,
            window: VecDeque::with_capacity(capacity),
        }
    }

    pub fn size(&self) -> WindowSize {
        self.size
    }

    /// Feed the next item and return the maximum of the trailing window.
    ///
    /// Items must arrive with strictly increasing indices.
    pub fn advance(&mut self, item: ValueItem) -> f64 {
        if self.size.is_passthrough() {
            return item.value;
        }

        self.evict_expired(item.index);

        match self.classify(&item) {
            Placement::Empty => {
                self.window.push_back(item);
                return item.value;
            }
            Placement::Dominates => {
                self.window.clear();
                self.window.push_back(item);
                return item.value;
            }
            Placement::AboveBack => {
                while let Some(back) = self.window.back() {
                    if back.value >= item.value {
                        break;
                    }
                    self.window.pop_back();
                }
                self.window.push_back(item);
            }
            Placement::BelowBack => {
                self.window.push_back(item);
            }
        }

        self.window
            .front()
            .map(|front| front.value)
            .unwrap_or(item.value)
    }

    /// With contiguous indices at most one candidate ages out per advance
    fn evict_expired(&mut self, index: u64) {
        while let Some(front) = self.window.front() {
            if index.saturating_sub(front.index) < self.size.get() {
                break;
            }
            self.window.pop_front();
        }
    }

    fn classify(&self, item: &ValueItem) -> Placement {
        let (front, back) = match (self.window.front(), self.window.back()) {
            (Some(front), Some(back)) => (front, back),
            _ => return Placement::Empty,
        };

        if item.value >= front.value {
            Placement::Dominates
        } else if item.value > back.value {
            Placement::AboveBack
        } else {
            Placement::BelowBack
        }
    }

    /// Current maximum, if any item has been seen.
    /// Always `None` for a passthrough window, which keeps no candidates.
    pub fn current_max(&self) -> Option<f64> {
        self.window.front().map(|front| front.value)
    }

    /// Candidates front-to-back
    pub fn candidates(&self) -> impl Iterator<Item = &ValueItem> {
        self.window.iter()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Drop all candidates, keeping the configured size
    pub fn reset(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const INPUT: [f64; 20] = [
        86.99, 31.4, -65.77, -44.31, 53.96, -33.68, -38.23, -62.65, 54.23, 7.05, 97.26, 74.82,
        72.93, -26.01, 39.5, 44.66, 4.56, -9.4, -98.38, -26.23,
    ];

    const EXPECTED_W3: [f64; 21] = [
        86.99, 86.99, 86.99, 31.4, 53.96, 53.96, 53.96, -33.68, 54.23, 54.23, 97.26, 97.26, 97.26,
        74.82, 72.93, 44.66, 44.66, 44.66, 4.56, -9.4, -9.4,
    ];

    fn run(size: i64, values: &[f64]) -> Vec<f64> {
        let mut engine = WindowEngine::new(WindowSize::new(size));
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| engine.advance(ValueItem::new(v, i as u64)))
            .collect()
    }

    fn brute_force(size: usize, values: &[f64]) -> Vec<f64> {
        (0..values.len())
            .map(|i| {
                let start = (i + 1).saturating_sub(size);
                values[start..=i]
                    .iter()
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max)
            })
            .collect()
    }

    #[test]
    fn test_known_sequence_window_three() {
        let result = run(3, &INPUT);
        assert_eq!(result.as_slice(), &EXPECTED_W3[..INPUT.len()]);
    }

    #[test]
    fn test_window_one_is_identity() {
        assert_eq!(run(1, &INPUT), INPUT.to_vec());
    }

    #[test]
    fn test_non_positive_size_matches_size_one() {
        assert_eq!(run(-10, &INPUT), run(1, &INPUT));
        assert_eq!(run(0, &INPUT), INPUT.to_vec());
    }

    #[test]
    fn test_passthrough_keeps_no_candidates() {
        let mut engine = WindowEngine::new(WindowSize::new(1));
        engine.advance(ValueItem::new(5.0, 0));
        assert!(engine.is_empty());
        assert_eq!(engine.current_max(), None);
    }

    #[test]
    fn test_matches_brute_force_on_random_input() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for size in [2usize, 3, 4, 7, 16, 50] {
            let values: Vec<f64> = (0..500)
                .map(|_| (rng.gen_range(-1000..1000) as f64) / 10.0)
                .collect();
            assert_eq!(
                run(size as i64, &values),
                brute_force(size, &values),
                "window size {}",
                size
            );
        }
    }

    #[test]
    fn test_window_larger_than_input_is_running_max() {
        let values = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        assert_eq!(
            run(100, &values),
            vec![3.0, 3.0, 4.0, 4.0, 5.0, 9.0, 9.0, 9.0]
        );
    }

    #[test]
    fn test_ascending_input_keeps_single_candidate() {
        let mut engine = WindowEngine::new(WindowSize::new(4));
        for i in 0..10 {
            assert_eq!(engine.advance(ValueItem::new(i as f64, i)), i as f64);
            assert_eq!(engine.len(), 1);
        }
    }

    #[test]
    fn test_descending_input_expires_front() {
        let values = [10.0, 9.0, 8.0, 7.0, 6.0, 5.0];
        assert_eq!(run(3, &values), vec![10.0, 10.0, 10.0, 9.0, 8.0, 7.0]);
    }

    #[test]
    fn test_smaller_trailing_value_appends_untouched() {
        let mut engine = WindowEngine::new(WindowSize::new(5));
        engine.advance(ValueItem::new(9.0, 0));
        engine.advance(ValueItem::new(6.0, 1));
        engine.advance(ValueItem::new(3.0, 2));
        let before: Vec<ValueItem> = engine.candidates().copied().collect();

        assert_eq!(engine.advance(ValueItem::new(1.0, 3)), 9.0);

        let after: Vec<ValueItem> = engine.candidates().copied().collect();
        assert_eq!(&after[..before.len()], before.as_slice());
        assert_eq!(after.last(), Some(&ValueItem::new(1.0, 3)));
    }

    #[test]
    fn test_equal_value_takes_over_front() {
        let mut engine = WindowEngine::new(WindowSize::new(3));
        engine.advance(ValueItem::new(5.0, 0));
        engine.advance(ValueItem::new(1.0, 1));
        assert_eq!(engine.advance(ValueItem::new(5.0, 2)), 5.0);
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.candidates().next().map(ValueItem::index), Some(2));

        // the newer 5.0 outlives the first one
        assert_eq!(engine.advance(ValueItem::new(0.0, 3)), 5.0);
        assert_eq!(engine.advance(ValueItem::new(0.0, 4)), 5.0);
        assert_eq!(engine.advance(ValueItem::new(0.0, 5)), 0.0);
    }

    #[test]
    fn test_candidates_descending_within_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let size = 6u64;
        let mut engine = WindowEngine::new(WindowSize::new(size as i64));
        for index in 0..300u64 {
            engine.advance(ValueItem::new(rng.gen_range(-50..50) as f64, index));

            let candidates: Vec<ValueItem> = engine.candidates().copied().collect();
            for pair in candidates.windows(2) {
                assert!(pair[0].value() >= pair[1].value());
            }
            for candidate in &candidates {
                assert!(candidate.index() + size > index);
                assert!(candidate.index() <= index);
            }
        }
    }

    #[test]
    fn test_reset_clears_candidates() {
        let mut engine = WindowEngine::new(WindowSize::new(3));
        engine.advance(ValueItem::new(2.0, 0));
        engine.advance(ValueItem::new(1.0, 1));
        engine.reset();
        assert!(engine.is_empty());
        assert_eq!(engine.size().get(), 3);
    }
}
