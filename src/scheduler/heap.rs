//! Schedule Heap Module
//!
//! Binary min-heap of keys ordered by their rounded expiration tick.

// == Heap Entry ==
/// A key waiting for its expiration tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledKey {
    /// Cache key to expire
    pub key: String,
    /// Rounded tick (Unix seconds) at which the key becomes due
    pub tick: i64,
    /// Insertion sequence, breaks ties between equal ticks
    seq: u64,
}

impl ScheduledKey {
    fn sort_key(&self) -> (i64, u64) {
        (self.tick, self.seq)
    }
}

// == Schedule Heap ==
/// Min-heap keyed by `(tick, insertion order)`.
///
/// Entries with the same tick pop in the order they were pushed.
#[derive(Debug, Default)]
pub struct ScheduleHeap {
    items: Vec<ScheduledKey>,
    next_seq: u64,
}

impl ScheduleHeap {
    // == Constructor ==
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    // == Push ==
    /// Adds `key` due at `tick`. O(log n).
    pub fn push(&mut self, key: String, tick: i64) {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.items.push(ScheduledKey { key, tick, seq });
        self.sift_up(self.items.len() - 1);
    }

    // == Pop ==
    /// Removes and returns the entry with the smallest tick. O(log n).
    pub fn pop(&mut self) -> Option<ScheduledKey> {
        if self.items.is_empty() {
            return None;
        }

        let last = self.items.len() - 1;
        self.items.swap(0, last);
        let top = self.items.pop();
        if !self.items.is_empty() {
            self.sift_down(0);
        }
        top
    }

    // == Pop Due ==
    /// Pops every entry whose tick is at or before `now`, earliest first.
    pub fn pop_due(&mut self, now: i64) -> Vec<ScheduledKey> {
        let mut due = Vec::new();
        while self.peek().is_some_and(|top| top.tick <= now) {
            if let Some(item) = self.pop() {
                due.push(item);
            }
        }
        due
    }

    // == Peek ==
    /// Returns the entry with the smallest tick without removing it.
    pub fn peek(&self) -> Option<&ScheduledKey> {
        self.items.first()
    }

    // == Length ==
    /// Returns the number of scheduled keys.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if self.items[idx].sort_key() >= self.items[parent].sort_key() {
                break;
            }
            self.items.swap(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * idx + 1;
            let right = left + 1;
            let mut smallest = idx;

            if left < len && self.items[left].sort_key() < self.items[smallest].sort_key() {
                smallest = left;
            }
            if right < len && self.items[right].sort_key() < self.items[smallest].sort_key() {
                smallest = right;
            }
            if smallest == idx {
                break;
            }

            self.items.swap(idx, smallest);
            idx = smallest;
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn ticks(heap: &mut ScheduleHeap) -> Vec<i64> {
        std::iter::from_fn(|| heap.pop()).map(|item| item.tick).collect()
    }

    #[test]
    fn test_heap_new() {
        let heap = ScheduleHeap::new();
        assert!(heap.is_empty());
        assert_eq!(heap.len(), 0);
        assert!(heap.peek().is_none());
    }

    #[test]
    fn test_heap_len() {
        let mut heap = ScheduleHeap::new();
        heap.push("A".to_string(), 30);
        heap.push("B".to_string(), 20);
        heap.push("C".to_string(), 10);

        assert_eq!(heap.len(), 3);
        assert!(!heap.is_empty());
    }

    #[test]
    fn test_heap_pops_in_tick_order() {
        let mut heap = ScheduleHeap::new();
        heap.push("A".to_string(), 30);
        heap.push("B".to_string(), 20);
        heap.push("C".to_string(), 10);

        assert_eq!(heap.peek().map(|item| item.key.as_str()), Some("C"));
        assert_eq!(ticks(&mut heap), vec![10, 20, 30]);
        assert!(heap.pop().is_none());
    }

    #[test]
    fn test_heap_equal_ticks_pop_fifo() {
        let mut heap = ScheduleHeap::new();
        heap.push("first".to_string(), 60);
        heap.push("early".to_string(), 0);
        heap.push("second".to_string(), 60);
        heap.push("third".to_string(), 60);

        let keys: Vec<String> = std::iter::from_fn(|| heap.pop()).map(|i| i.key).collect();
        assert_eq!(keys, vec!["early", "first", "second", "third"]);
    }

    #[test]
    fn test_heap_interleaved_push_pop() {
        let mut heap = ScheduleHeap::new();
        heap.push("a".to_string(), 50);
        heap.push("b".to_string(), 40);
        assert_eq!(heap.pop().map(|i| i.tick), Some(40));

        heap.push("c".to_string(), 10);
        heap.push("d".to_string(), 70);
        heap.push("e".to_string(), 45);

        assert_eq!(ticks(&mut heap), vec![10, 45, 50, 70]);
    }

    #[test]
    fn test_heap_pop_due() {
        let mut heap = ScheduleHeap::new();
        heap.push("a".to_string(), 120);
        heap.push("b".to_string(), 60);
        heap.push("c".to_string(), 180);

        let due = heap.pop_due(120);
        let keys: Vec<&str> = due.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(heap.len(), 1);

        assert!(heap.pop_due(179).is_empty());
        assert_eq!(heap.pop_due(i64::MAX).len(), 1);
        assert!(heap.is_empty());
    }
}
