//! Utilities for working with probabilities.

use std::cmp::Ordering;

pub trait SliceExt {
    fn sum(&self) -> f64;
    fn normalise(&mut self, target: f64) -> f64;
    fn scale(&mut self, factor: f64);
    fn apportion(&self, total: u32) -> Vec<u32>;
}
impl SliceExt for [f64] {
    fn sum(&self) -> f64 {
        self.iter().sum()
    }

    /// Scales the elements so that they sum to `target`, returning the sum prior to scaling.
    fn normalise(&mut self, target: f64) -> f64 {
        let sum = self.sum();
        self.scale(target / sum);
        sum
    }

    fn scale(&mut self, factor: f64) {
        for element in self {
            *element *= factor;
        }
    }

    /// Distributes an integer `total` across the elements in proportion to their values
    /// (largest remainder method). Every element first receives the integer part of its
    /// share; the units left over go one apiece to the elements with the largest
    /// fractional parts. Equal fractional parts favour the element that appears first.
    fn apportion(&self, total: u32) -> Vec<u32> {
        let sum = self.sum();
        assert!(
            sum.is_finite() && sum > 0.0,
            "cannot apportion over a non-positive sum {sum}"
        );
        let shares = self
            .iter()
            .map(|&value| value / sum * total as f64)
            .collect::<Vec<_>>();
        let mut allotted = shares
            .iter()
            .map(|share| share.floor() as u32)
            .collect::<Vec<_>>();
        let leftover = total.saturating_sub(allotted.iter().sum());

        let mut by_remainder = (0..shares.len()).collect::<Vec<_>>();
        by_remainder.sort_by(|&a, &b| {
            let (rem_a, rem_b) = (shares[a].fract(), shares[b].fract());
            match rem_b.total_cmp(&rem_a) {
                Ordering::Equal => a.cmp(&b),
                ordering => ordering,
            }
        });
        for &index in by_remainder.iter().take(leftover as usize) {
            allotted[index] += 1;
        }
        allotted
    }
}
