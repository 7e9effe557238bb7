use chrono::NaiveDateTime;
use std::cmp::Ordering;

use crate::models::TimeSeries;

/// Observation and model values sampled at common timestamps
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchedData {
    pub time: Vec<NaiveDateTime>,
    pub obs: Vec<f64>,
    pub models: Vec<Vec<f64>>,
}

impl MatchedData {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Rows with `start <= time <= end`; open bounds are unrestricted
    pub fn sel(&self, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        let from = match start {
            Some(start) => self.time.partition_point(|t| *t < start),
            None => 0,
        };
        let to = match end {
            Some(end) => self.time.partition_point(|t| *t <= end),
            None => self.time.len(),
        };
        let to = to.max(from);

        Self {
            time: self.time[from..to].to_vec(),
            obs: self.obs[from..to].to_vec(),
            models: self.models.iter().map(|m| m[from..to].to_vec()).collect(),
        }
    }
}

/// Timestamps present in both sorted slices
pub fn intersect_times(a: &[NaiveDateTime], b: &[NaiveDateTime]) -> Vec<NaiveDateTime> {
    let mut common = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                common.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }

    common
}

/// Values of `series` at `times`, which must be a sorted subset of its index
fn values_at(series: &TimeSeries, times: &[NaiveDateTime]) -> Vec<f64> {
    let mut values = Vec::with_capacity(times.len());
    let mut j = 0;

    for t in times {
        while j < series.time.len() && series.time[j] < *t {
            j += 1;
        }
        if j < series.time.len() && series.time[j] == *t {
            values.push(series.values[j]);
        }
    }

    values
}

/// Align an observation with any number of model series on the timestamps
/// they all share
pub fn match_series(obs: &TimeSeries, models: &[&TimeSeries]) -> MatchedData {
    let time = models
        .iter()
        .fold(obs.time.clone(), |common, model| {
            intersect_times(&common, &model.time)
        });

    MatchedData {
        obs: values_at(obs, &time),
        models: models.iter().map(|m| values_at(m, &time)).collect(),
        time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hour(h: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 10, 27)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::hours(h)
    }

    fn series(hours: &[i64]) -> TimeSeries {
        TimeSeries {
            time: hours.iter().map(|&h| hour(h)).collect(),
            values: hours.iter().map(|&h| h as f64).collect(),
        }
    }

    #[test]
    fn test_intersect_times() {
        let a: Vec<_> = [0, 1, 2, 4, 6].iter().map(|&h| hour(h)).collect();
        let b: Vec<_> = [1, 2, 3, 6, 7].iter().map(|&h| hour(h)).collect();
        assert_eq!(intersect_times(&a, &b), vec![hour(1), hour(2), hour(6)]);
        assert!(intersect_times(&a, &[]).is_empty());
    }

    #[test]
    fn test_match_series_multiple_models() {
        let obs = series(&[0, 1, 2, 3, 4, 5]);
        let m1 = series(&[1, 2, 3, 4]);
        let m2 = series(&[2, 3, 4, 5, 6]);

        let matched = match_series(&obs, &[&m1, &m2]);

        assert_eq!(matched.time, vec![hour(2), hour(3), hour(4)]);
        assert_eq!(matched.obs, vec![2.0, 3.0, 4.0]);
        assert_eq!(matched.models, vec![vec![2.0, 3.0, 4.0], vec![2.0, 3.0, 4.0]]);
    }

    #[test]
    fn test_disjoint_series() {
        let matched = match_series(&series(&[0, 1]), &[&series(&[5, 6])]);
        assert!(matched.is_empty());
        assert_eq!(matched.models, vec![Vec::<f64>::new()]);
    }

    #[test]
    fn test_sel_is_inclusive() {
        let matched = match_series(&series(&[0, 1, 2, 3, 4]), &[&series(&[0, 1, 2, 3, 4])]);

        let subset = matched.sel(Some(hour(1)), Some(hour(3)));
        assert_eq!(subset.time, vec![hour(1), hour(2), hour(3)]);
        assert_eq!(subset.models[0], vec![1.0, 2.0, 3.0]);

        assert_eq!(matched.sel(None, Some(hour(0))).len(), 1);
        assert!(matched.sel(Some(hour(3)), Some(hour(1))).is_empty());
    }
}
