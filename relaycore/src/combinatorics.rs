//! Counting the ways every station can be placed.

/// Number of ordered ways to put `stations` distinct stations on `positions` positions,
/// `positions! / (positions - stations)!`.
///
/// `None` when the count does not fit a `u64`. Zero when there are more stations than positions.
///
/// ```
/// # use relaycore::combinatorics::arrangements;
/// assert_eq!(arrangements(5, 2), Some(20));
/// assert_eq!(arrangements(2, 5), Some(0));
/// ```
pub fn arrangements(positions: u64, stations: u64) -> Option<u64> {
    if stations > positions {
        return Some(0);
    }

    ((positions - stations + 1)..=positions).try_fold(1u64, |acc, k| acc.checked_mul(k))
}

/// `log10` of [`arrangements`], for counts too large for an integer.
/// `-inf` when there are more stations than positions.
pub fn log10_arrangements(positions: u64, stations: u64) -> f64 {
    if stations > positions {
        return f64::NEG_INFINITY;
    }

    ((positions - stations + 1)..=positions)
        .map(|k| (k as f64).log10())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_close;

    #[test]
    fn small_counts() {
        assert_eq!(arrangements(5, 2), Some(20));
        assert_eq!(arrangements(5, 5), Some(120));
        assert_eq!(arrangements(5, 0), Some(1));
        assert_eq!(arrangements(0, 0), Some(1));
        assert_eq!(arrangements(3, 4), Some(0));
    }

    #[test]
    fn overflow_is_detected() {
        assert_eq!(arrangements(20, 20), Some(2_432_902_008_176_640_000));
        assert_eq!(arrangements(21, 21), None);
        assert_eq!(arrangements(1000, 3), Some(997_002_000));
        assert_eq!(arrangements(1000, 10), None);
    }

    #[test]
    fn log_matches_exact() {
        assert_close(log10_arrangements(5, 2), 20f64.log10());
        assert_close(log10_arrangements(20, 20), 2_432_902_008_176_640_000f64.log10());
        assert_eq!(log10_arrangements(5, 0), 0.0);
        assert_eq!(log10_arrangements(1, 2), f64::NEG_INFINITY);
    }
}
