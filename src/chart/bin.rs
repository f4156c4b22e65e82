//! Equal-width binning over a fixed domain

use serde::Deserialize;

/// One histogram bucket, `[x0, x1)` except the last which is closed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub x0: f64,
    pub x1: f64,
    pub count: usize,
}

/// Partitions samples into `count` buckets over `domain`.
///
/// Bounds come from the domain alone, so the same domain and count always
/// produce the same buckets whatever the sample.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Binner {
    pub domain: (f64, f64),
    pub count: usize,
}

impl Binner {
    pub fn new(domain: (f64, f64), count: usize) -> Self {
        Self { domain, count }
    }

    fn is_valid(&self) -> bool {
        let (lo, hi) = self.domain;
        self.count > 0 && lo.is_finite() && hi.is_finite() && lo < hi
    }

    /// The `count + 1` bucket edges
    pub fn thresholds(&self) -> Vec<f64> {
        if !self.is_valid() {
            return vec![];
        }
        let (lo, hi) = self.domain;
        let width = (hi - lo) / self.count as f64;
        (0..=self.count)
            .map(|i| if i == self.count { hi } else { lo + width * i as f64 })
            .collect()
    }

    /// Count samples per bucket; values outside the domain are dropped
    pub fn bin(&self, values: impl IntoIterator<Item = f64>) -> Vec<Bin> {
        let edges = self.thresholds();
        if edges.is_empty() {
            return vec![];
        }
        let mut bins: Vec<Bin> = edges
            .windows(2)
            .map(|w| Bin {
                x0: w[0],
                x1: w[1],
                count: 0,
            })
            .collect();

        let (lo, hi) = self.domain;
        let width = (hi - lo) / self.count as f64;
        for value in values {
            if !value.is_finite() || value < lo || value > hi {
                continue;
            }
            let index = (((value - lo) / width).floor() as usize).min(self.count - 1);
            bins[index].count += 1;
        }
        bins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        let binner = Binner::new((0.0, 1000.0), 4);
        assert_eq!(binner.thresholds(), vec![0.0, 250.0, 500.0, 750.0, 1000.0]);
    }

    #[test]
    fn test_bin_counts_and_edges() {
        let binner = Binner::new((0.0, 10.0), 5);
        let bins = binner.bin(vec![0.0, 1.9, 2.0, 5.5, 10.0, -1.0, 11.0, f64::NAN]);
        let counts: Vec<usize> = bins.iter().map(|b| b.count).collect();
        // 10.0 is the domain maximum and lands in the last bucket
        assert_eq!(counts, vec![2, 1, 1, 0, 1]);
    }

    #[test]
    fn test_bounds_independent_of_sample_order() {
        let binner = Binner::new((0.0, 1000.0), 20);
        let sample = vec![512.0, 3.0, 999.0, 640.0, 640.0, 12.5, 700.0];
        let mut reversed = sample.clone();
        reversed.reverse();

        let a = binner.bin(sample);
        let b = binner.bin(reversed);
        assert_eq!(a, b);
        let empty = binner.bin(Vec::new());
        let edges = |bins: &[Bin]| bins.iter().map(|b| (b.x0, b.x1)).collect::<Vec<_>>();
        assert_eq!(edges(&a), edges(&empty));
    }

    #[test]
    fn test_invalid_domain() {
        assert!(Binner::new((5.0, 5.0), 3).bin(vec![5.0]).is_empty());
        assert!(Binner::new((0.0, 1.0), 0).thresholds().is_empty());
    }
}
