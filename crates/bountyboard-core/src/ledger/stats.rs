//! Post-pass statistics over aggregated contributors.

use crate::domain::Contributor;

/// Population mean and standard deviation of each contributor's
/// time-to-disclosure samples.
pub fn update_mean_and_deviation_of_disclosure(contributors: &mut [Contributor]) {
    for contributor in contributors {
        let (mean, std_dev) = mean_and_std_dev(&contributor.disclosure_minutes);
        contributor.mean_disclosure_minutes = mean;
        contributor.disclosure_std_dev_minutes = std_dev;
    }
}

/// Severity score averaged over the contributor's fix count.
pub fn update_average_severity(contributors: &mut [Contributor]) {
    for contributor in contributors {
        contributor.mean_severity = if contributor.fix_count == 0 {
            0.0
        } else {
            contributor.severity.weighted_total() / f64::from(contributor.fix_count)
        };
    }
}

fn mean_and_std_dev(samples: &[i64]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|s| *s as f64).sum::<f64>() / n;
    let variance = samples
        .iter()
        .map(|s| {
            let d = *s as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}
