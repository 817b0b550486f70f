use crate::predicate::Op;

/// Fixed-width histogram over an integer column, used to estimate the
/// selectivity of single-column predicates.
pub struct IntHistogram {
    min: i64,
    max: i64,
    width: i64,
    heights: Vec<usize>,
    total: usize,
}

impl IntHistogram {
    /// `buckets` is a ceiling: the effective bucket count may round up
    /// by one so `bucket_count * width` covers `[min, max]` entirely.
    pub fn new(buckets: usize, min: i32, max: i32) -> Self {
        assert!(min <= max, "min {} > max {}", min, max);
        assert!(buckets > 0, "histogram needs at least one bucket");

        let min = min as i64;
        let max = max as i64;
        let span = max - min + 1;
        let width = std::cmp::max(1, (span + buckets as i64 - 1) / buckets as i64);
        let bucket_count = ((span + width - 1) / width) as usize;

        Self {
            min,
            max,
            width,
            heights: vec![0; bucket_count],
            total: 0,
        }
    }

    /// Record one value. Values outside `[min, max]` are ignored.
    pub fn add_value(&mut self, v: i32) {
        let v = v as i64;
        if v < self.min || v > self.max {
            return;
        }
        let bucket = ((v - self.min) / self.width) as usize;
        self.heights[bucket] += 1;
        self.total += 1;
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Estimated fraction of recorded values matching `v op value`,
    /// in [0, 1].
    pub fn estimate_selectivity(&self, op: Op, v: i32) -> f64 {
        let v = v as i64;
        let selectivity = match op {
            Op::Equals | Op::Like => self.eq_selectivity(v),
            Op::NotEquals => 1.0 - self.eq_selectivity(v),
            Op::GreaterThan => self.gt_selectivity(v),
            Op::GreaterThanOrEq => self.gt_selectivity(v - 1),
            Op::LessThan => self.lt_selectivity(v),
            Op::LessThanOrEq => self.lt_selectivity(v + 1),
        };
        selectivity.max(0.0).min(1.0)
    }

    fn bucket_of(&self, v: i64) -> usize {
        ((v - self.min) / self.width) as usize
    }

    // height(b) / width / total
    fn eq_selectivity(&self, v: i64) -> f64 {
        if self.total == 0 || v < self.min || v > self.max {
            return 0.0;
        }
        let b = self.bucket_of(v);
        self.heights[b] as f64 / self.width as f64 / self.total as f64
    }

    // fraction of v's bucket to the right of v, plus all buckets
    // entirely to the right
    fn gt_selectivity(&self, v: i64) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        if v < self.min {
            return 1.0;
        }
        if v >= self.max {
            return 0.0;
        }

        let b = self.bucket_of(v);
        let bucket_right = self.min + (b as i64 + 1) * self.width - 1;
        let part = (bucket_right - v) as f64 / self.width as f64 * self.heights[b] as f64
            / self.total as f64;

        let rest: usize = self.heights[b + 1..].iter().sum();
        part + rest as f64 / self.total as f64
    }

    fn lt_selectivity(&self, v: i64) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        if v <= self.min {
            return 0.0;
        }
        if v > self.max {
            return 1.0;
        }

        let b = self.bucket_of(v);
        let bucket_left = self.min + b as i64 * self.width;
        let part = (v - bucket_left) as f64 / self.width as f64 * self.heights[b] as f64
            / self.total as f64;

        let rest: usize = self.heights[..b].iter().sum();
        part + rest as f64 / self.total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(buckets: usize, min: i32, max: i32) -> IntHistogram {
        let mut hist = IntHistogram::new(buckets, min, max);
        for v in min..=max {
            hist.add_value(v);
        }
        hist
    }

    #[test]
    fn test_out_of_range_values_ignored() {
        let mut hist = IntHistogram::new(10, 0, 99);
        hist.add_value(-1);
        hist.add_value(100);
        assert_eq!(hist.total(), 0);
        assert_eq!(hist.estimate_selectivity(Op::Equals, -1), 0.0);
        assert_eq!(hist.estimate_selectivity(Op::Equals, 100), 0.0);
    }

    #[test]
    fn test_range_boundaries() {
        let hist = filled(10, 0, 99);
        assert_eq!(hist.estimate_selectivity(Op::GreaterThan, 99), 0.0);
        assert_eq!(hist.estimate_selectivity(Op::LessThan, 0), 0.0);
        assert_eq!(hist.estimate_selectivity(Op::GreaterThan, -1), 1.0);
        assert_eq!(hist.estimate_selectivity(Op::LessThan, 100), 1.0);
    }

    #[test]
    fn test_partition_of_unity() {
        let hist = filled(7, -10, 52);
        for v in -10..=52 {
            let total = hist.estimate_selectivity(Op::GreaterThan, v)
                + hist.estimate_selectivity(Op::Equals, v)
                + hist.estimate_selectivity(Op::LessThan, v);
            assert!(
                (total - 1.0).abs() < 1e-9,
                "GT + EQ + LT = {} at v = {}",
                total,
                v
            );
        }
    }

    #[test]
    fn test_uniform_eq_estimate() {
        let hist = filled(10, 0, 99);
        // every value appears once in 100 values
        let sel = hist.estimate_selectivity(Op::Equals, 37);
        assert!((sel - 0.01).abs() < 1e-9);
        let sel = hist.estimate_selectivity(Op::NotEquals, 37);
        assert!((sel - 0.99).abs() < 1e-9);
    }

    #[test]
    fn test_ge_le_offsets() {
        let hist = filled(10, 0, 99);
        assert!((hist.estimate_selectivity(Op::GreaterThanOrEq, 0) - 1.0).abs() < 1e-9);
        assert!((hist.estimate_selectivity(Op::LessThanOrEq, 99) - 1.0).abs() < 1e-9);

        let gt = hist.estimate_selectivity(Op::GreaterThan, 49);
        let ge = hist.estimate_selectivity(Op::GreaterThanOrEq, 50);
        assert!((gt - ge).abs() < 1e-9);
    }

    #[test]
    fn test_narrow_range_wide_buckets() {
        // span smaller than the bucket count: width clamps to 1
        let mut hist = IntHistogram::new(100, 0, 9);
        for v in 0..10 {
            hist.add_value(v);
        }
        let sel = hist.estimate_selectivity(Op::Equals, 5);
        assert!((sel - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_skewed_distribution() {
        let mut hist = IntHistogram::new(10, 0, 99);
        for _ in 0..90 {
            hist.add_value(5);
        }
        for _ in 0..10 {
            hist.add_value(95);
        }

        let low = hist.estimate_selectivity(Op::LessThan, 50);
        let high = hist.estimate_selectivity(Op::GreaterThanOrEq, 50);
        assert!(low > 0.8);
        assert!(high < 0.2);
    }
}
