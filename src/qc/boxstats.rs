//! Per-sample distribution summaries

use ndarray::ArrayView2;
use serde::Serialize;

use crate::stats::{median, quantile_type7, sorted_finite};

/// Five-number summary of one sample's transformed values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub sample_id: String,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Median deviates from the median of all sample medians by more than the tolerance
    pub flagged: bool,
}

/// Summaries for every column of `data` (genes x samples).
///
/// Samples whose median is further than `tolerance` from the median of the
/// sample medians are flagged and logged. Flagging never fails the run.
pub fn box_stats(data: ArrayView2<'_, f64>, sample_ids: &[String], tolerance: f64) -> Vec<BoxStats> {
    let mut stats: Vec<BoxStats> = data
        .columns()
        .into_iter()
        .zip(sample_ids)
        .map(|(column, id)| {
            let sorted = sorted_finite(&column.to_vec());
            BoxStats {
                sample_id: id.clone(),
                min: sorted.first().copied().unwrap_or(f64::NAN),
                q1: quantile_type7(&sorted, 0.25),
                median: quantile_type7(&sorted, 0.5),
                q3: quantile_type7(&sorted, 0.75),
                max: sorted.last().copied().unwrap_or(f64::NAN),
                flagged: false,
            }
        })
        .collect();

    let center = median(&stats.iter().map(|s| s.median).collect::<Vec<_>>());
    for s in &mut stats {
        let deviation = (s.median - center).abs();
        if deviation > tolerance {
            s.flagged = true;
            log::warn!(
                "Sample {} median {:.3} is {:.3} from the median of medians ({:.3})",
                s.sample_id,
                s.median,
                deviation,
                center
            );
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("s{}", i)).collect()
    }

    #[test]
    fn test_five_numbers() {
        let data = array![[1.0, 5.0], [2.0, 6.0], [3.0, 7.0], [4.0, 8.0], [5.0, 9.0]];
        let stats = box_stats(data.view(), &ids(2), 10.0);
        assert_eq!(stats[0].min, 1.0);
        assert_eq!(stats[0].q1, 2.0);
        assert_eq!(stats[0].median, 3.0);
        assert_eq!(stats[0].q3, 4.0);
        assert_eq!(stats[0].max, 5.0);
        assert_eq!(stats[1].median, 7.0);
        assert!(stats.iter().all(|s| !s.flagged));
    }

    #[test]
    fn test_shifted_sample_flagged() {
        let data = array![[1.0, 1.1, 0.9, 4.0], [2.0, 2.1, 1.9, 5.0], [3.0, 3.1, 2.9, 6.0]];
        let stats = box_stats(data.view(), &ids(4), 1.0);
        let flagged: Vec<&str> = stats.iter().filter(|s| s.flagged).map(|s| s.sample_id.as_str()).collect();
        assert_eq!(flagged, vec!["s4"]);
    }
}
