//! Contiguous memo window used by [`CachedIndicator`](super::CachedIndicator).

use std::collections::VecDeque;

/// Values for a contiguous run of global indices `[first, first + len)`.
///
/// Grows at the back (next index in order) and shrinks at the front when the
/// series evicts. The back is cut only when the newest bar is replaced.
///
/// The last value trimmed off the front stays behind as a carry. It is not
/// part of the window: [`get`](Self::get) never returns it, only
/// [`previous`](Self::previous) does, so a recursive formula can continue
/// from it after its bar has been evicted.
#[derive(Debug)]
pub struct CacheWindow<T> {
    first: usize,
    values: VecDeque<T>,
    carry: Option<(usize, T)>,
}

impl<T> Default for CacheWindow<T> {
    fn default() -> Self {
        Self {
            first: 0,
            values: VecDeque::new(),
            carry: None,
        }
    }
}

impl<T> CacheWindow<T> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Oldest retained index.
    pub fn first_index(&self) -> Option<usize> {
        (!self.values.is_empty()).then_some(self.first)
    }

    /// Newest computed index.
    pub fn highest_index(&self) -> Option<usize> {
        (self.first + self.values.len()).checked_sub(1).filter(|_| !self.values.is_empty())
    }

    /// Index the next pushed value must have (0 while empty).
    pub fn next_index(&self) -> usize {
        if self.values.is_empty() {
            0
        } else {
            self.first + self.values.len()
        }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        index
            .checked_sub(self.first)
            .and_then(|offset| self.values.get(offset))
    }

    pub fn oldest(&self) -> Option<&T> {
        self.values.front()
    }

    /// Value at `index - 1`, falling back to the carry.
    pub fn previous(&self, index: usize) -> Option<&T> {
        let prev = index.checked_sub(1)?;
        self.get(prev).or_else(|| match &self.carry {
            Some((carried, value)) if *carried == prev => Some(value),
            _ => None,
        })
    }

    /// Index of the carried value, if any.
    pub fn carry_index(&self) -> Option<usize> {
        self.carry.as_ref().map(|(index, _)| *index)
    }

    /// Appends the value for `index`.
    ///
    /// An empty window starts at `index`; otherwise `index` must be
    /// [`next_index`](Self::next_index).
    pub fn push(&mut self, index: usize, value: T) {
        if self.values.is_empty() {
            self.first = index;
        }
        debug_assert_eq!(index, self.first + self.values.len());
        self.values.push_back(value);
    }

    /// Drops every value below `keep_from`; returns how many were dropped.
    ///
    /// The newest dropped value becomes the carry.
    pub fn trim_below(&mut self, keep_from: usize) -> usize {
        let drop = keep_from.saturating_sub(self.first).min(self.values.len());
        if drop > 0 {
            let newest = self.values.drain(..drop).last();
            self.carry = newest.map(|value| (self.first + drop - 1, value));
            self.first += drop;
        }
        drop
    }

    /// Drops every value at or above `from`, carry included; returns how
    /// many window values were dropped.
    pub fn truncate_from(&mut self, from: usize) -> usize {
        let keep = from.saturating_sub(self.first).min(self.values.len());
        let dropped = self.values.len() - keep;
        self.values.truncate(keep);
        if self.carry_index().is_some_and(|carried| carried >= from) {
            self.carry = None;
        }
        dropped
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.first = 0;
        self.carry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window() {
        let window: CacheWindow<u32> = CacheWindow::default();
        assert!(window.is_empty());
        assert_eq!(window.first_index(), None);
        assert_eq!(window.highest_index(), None);
        assert_eq!(window.next_index(), 0);
        assert_eq!(window.get(0), None);
    }

    #[test]
    fn first_push_anchors_the_window() {
        let mut window = CacheWindow::default();
        window.push(7, "a");
        window.push(8, "b");
        assert_eq!(window.first_index(), Some(7));
        assert_eq!(window.highest_index(), Some(8));
        assert_eq!(window.next_index(), 9);
        assert_eq!(window.get(6), None);
        assert_eq!(window.get(8), Some(&"b"));
    }

    #[test]
    fn trim_drops_head_only() {
        let mut window = CacheWindow::default();
        for i in 0..10 {
            window.push(i, i * 10);
        }
        assert_eq!(window.trim_below(4), 4);
        assert_eq!(window.first_index(), Some(4));
        assert_eq!(window.oldest(), Some(&40));
        assert_eq!(window.trim_below(2), 0);
        assert_eq!(window.len(), 6);
    }

    #[test]
    fn trimmed_value_is_carried_but_not_retained() {
        let mut window = CacheWindow::default();
        for i in 0..5 {
            window.push(i, i * 10);
        }
        window.trim_below(3);
        assert_eq!(window.get(2), None);
        assert_eq!(window.carry_index(), Some(2));
        assert_eq!(window.previous(3), Some(&20));
        assert_eq!(window.previous(4), Some(&30));
        assert_eq!(window.previous(2), None);
        assert_eq!(window.oldest(), Some(&30));
    }

    #[test]
    fn carry_survives_a_full_trim() {
        let mut window = CacheWindow::default();
        window.push(0, 'a');
        window.push(1, 'b');
        window.trim_below(2);
        assert!(window.is_empty());
        assert_eq!(window.previous(2), Some(&'b'));
        window.push(2, 'c');
        assert_eq!(window.previous(2), Some(&'b'));
        assert_eq!(window.previous(3), Some(&'c'));
    }

    #[test]
    fn truncate_cuts_the_newest_values() {
        let mut window = CacheWindow::default();
        for i in 0..6 {
            window.push(i, i);
        }
        window.trim_below(2);
        assert_eq!(window.truncate_from(5), 1);
        assert_eq!(window.highest_index(), Some(4));
        assert_eq!(window.truncate_from(9), 0);
        assert_eq!(window.carry_index(), Some(1));

        assert_eq!(window.truncate_from(1), 3);
        assert!(window.is_empty());
        assert_eq!(window.carry_index(), None);
    }

    #[test]
    fn trim_past_the_end_empties_and_reanchors() {
        let mut window = CacheWindow::default();
        window.push(0, 1);
        window.push(1, 2);
        assert_eq!(window.trim_below(50), 2);
        assert!(window.is_empty());
        assert_eq!(window.next_index(), 0);
        window.push(50, 3);
        assert_eq!(window.first_index(), Some(50));
    }

    #[test]
    fn clear_resets() {
        let mut window = CacheWindow::default();
        window.push(3, 1);
        window.push(4, 2);
        window.trim_below(4);
        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.first_index(), None);
        assert_eq!(window.carry_index(), None);
    }
}
