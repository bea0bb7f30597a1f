use serde::{Deserialize, Serialize};

/// Row filter statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    /// Rows handed to the filter
    pub rows_seen: u64,
    /// Rows that came out with no surviving cell
    pub rows_emptied: u64,
    /// Cells that passed the predicate
    pub cells_kept: u64,
    /// Cells that failed the predicate
    pub cells_dropped: u64,
}

impl FilterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_row(&mut self, kept: u64, dropped: u64) {
        self.rows_seen += 1;
        if kept == 0 {
            self.rows_emptied += 1;
        }
        self.cells_kept += kept;
        self.cells_dropped += dropped;
    }

    pub fn cells_seen(&self) -> u64 {
        self.cells_kept + self.cells_dropped
    }

    pub fn merge(&mut self, other: &FilterStats) {
        self.rows_seen += other.rows_seen;
        self.rows_emptied += other.rows_emptied;
        self.cells_kept += other.cells_kept;
        self.cells_dropped += other.cells_dropped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_row() {
        let mut stats = FilterStats::new();
        stats.record_row(1, 1);
        stats.record_row(0, 2);
        assert_eq!(stats.rows_seen, 2);
        assert_eq!(stats.rows_emptied, 1);
        assert_eq!(stats.cells_seen(), 4);
    }

    #[test]
    fn test_merge() {
        let mut total = FilterStats::new();
        let mut part = FilterStats::new();
        part.record_row(3, 0);
        total.merge(&part);
        total.merge(&part);
        assert_eq!(total.cells_kept, 6);
        assert_eq!(total.rows_seen, 2);
    }
}
