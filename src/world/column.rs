//! Per-column exposure metadata.
//!
//! For every (cx, cz) chunk column the world has ever loaded a chunk in, it
//! remembers the vertical span (in chunk units) where exposed chunks were
//! observed. The span only widens; it is advisory data that steers where
//! `evaluate_chunks_needed` looks vertically, never a correctness input.

/// The observed vertical extent of exposed chunks in one column, in chunk
/// coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpan {
    /// Lowest chunk y where an exposed chunk was seen
    pub min_exposed_y: i32,
    /// Highest chunk y where an exposed chunk was seen
    pub max_exposed_y: i32,
}

impl ColumnSpan {
    /// A span covering exactly one chunk y.
    pub fn at(cy: i32) -> Self {
        ColumnSpan {
            min_exposed_y: cy,
            max_exposed_y: cy,
        }
    }

    /// Widens the span to include a chunk y. Never shrinks.
    pub fn widen(&mut self, cy: i32) {
        self.min_exposed_y = self.min_exposed_y.min(cy);
        self.max_exposed_y = self.max_exposed_y.max(cy);
    }
}
