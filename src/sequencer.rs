use crate::window::ValueItem;

/// Assigns arrival indices to values as they leave the shared buffer.
///
/// Lives on the consumer thread only, so the counter is a plain integer.
#[derive(Debug, Default)]
pub struct Sequencer {
    next: u64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag `value` with the next index, starting at 0
    pub fn assign(&mut self, value: f64) -> ValueItem {
        let item = ValueItem::new(value, self.next);
        self.next += 1;
        item
    }

    /// Number of values indexed so far (last index + 1)
    pub fn total(&self) -> u64 {
        self.next
    }

    /// Index of the most recently assigned item
    pub fn last_index(&self) -> Option<u64> {
        self.next.checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_start_at_zero_and_increase() {
        let mut sequencer = Sequencer::new();
        assert_eq!(sequencer.total(), 0);
        assert_eq!(sequencer.last_index(), None);

        let first = sequencer.assign(3.5);
        let second = sequencer.assign(-1.0);
        assert_eq!((first.value(), first.index()), (3.5, 0));
        assert_eq!((second.value(), second.index()), (-1.0, 1));
        assert_eq!(sequencer.total(), 2);
        assert_eq!(sequencer.last_index(), Some(1));
    }
}
