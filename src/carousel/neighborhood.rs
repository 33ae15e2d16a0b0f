use std::collections::BTreeSet;

/// Positions around the viewer cursor that are prepared ahead of display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadNeighborhood {
    pub current_index: usize,
    pub indices: BTreeSet<usize>,
}

impl PreloadNeighborhood {
    /// `{current-1, current, current+1}` clipped to `0..len`.
    pub fn around(current_index: usize, len: usize) -> Self {
        let indices = if current_index < len {
            let first = current_index.saturating_sub(1);
            let last = (current_index + 1).min(len - 1);
            (first..=last).collect()
        } else {
            BTreeSet::new()
        };
        Self {
            current_index,
            indices,
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }
}
