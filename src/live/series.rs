//! Bounded chart series.
//!
//! A FIFO of `(label, ppm)` points: appending beyond capacity evicts the
//! oldest point, so `len() <= capacity()` holds after every operation.

use std::collections::VecDeque;

use serde::Serialize;

pub const MAX_POINTS: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub ppm: u32,
}

#[derive(Debug, Clone)]
pub struct ChartSeries {
    points: VecDeque<ChartPoint>,
    capacity: usize,
}

impl Default for ChartSeries {
    fn default() -> Self {
        Self::with_capacity(MAX_POINTS)
    }
}

impl ChartSeries {
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, label: impl Into<String>, ppm: u32) {
        while self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(ChartPoint {
            label: label.into(),
            ppm,
        });
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn points(&self) -> impl Iterator<Item = &ChartPoint> {
        self.points.iter()
    }

    pub fn last(&self) -> Option<&ChartPoint> {
        self.points.back()
    }

    pub fn values(&self) -> Vec<u32> {
        self.points.iter().map(|p| p.ppm).collect()
    }

    /// `time,ppm` with one line per point, oldest first.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("time,ppm\n");
        for p in &self.points {
            out.push_str(&format!("{},{}\n", p.label, p.ppm));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_first() {
        let mut series = ChartSeries::with_capacity(3);
        for (i, ppm) in [400, 500, 600, 700, 800].into_iter().enumerate() {
            series.push(format!("t{i}"), ppm);
            assert!(series.len() <= 3);
        }
        assert_eq!(series.values(), vec![600, 700, 800]);
        assert_eq!(series.points().next().map(|p| p.label.as_str()), Some("t2"));
    }

    #[test]
    fn csv_has_header_and_rows() {
        let mut series = ChartSeries::default();
        series.push("10:00:00", 812);
        series.push("10:00:01", 815);
        assert_eq!(series.to_csv(), "time,ppm\n10:00:00,812\n10:00:01,815\n");
        series.clear();
        assert_eq!(series.to_csv(), "time,ppm\n");
    }

    #[test]
    fn zero_capacity_keeps_one_point() {
        let mut series = ChartSeries::with_capacity(0);
        series.push("a", 1);
        series.push("b", 2);
        assert_eq!(series.values(), vec![2]);
    }
}
