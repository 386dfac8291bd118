//! Grouped statistics over a dataset.
//!
//! Every function here is pure: it borrows the dataset, never mutates it, and
//! returns fresh owned values. Empty inputs produce empty maps or
//! [`InsufficientData`], never a panic.

use super::stats::{mean, median, pearson, sample_std};
use crate::error::InsufficientData;
use crate::models::{Category, Dataset, Rating, Record, SizeBand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Field a dataset can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Green,
    Category,
    Rating,
    SizeBand,
}

/// A distinct value of a [`GroupKey`] field.
///
/// Ordering within a variant follows the field's own ordering, so ratings
/// come out A+ first and green groups come out non-green first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupValue {
    Green(bool),
    Category(Category),
    Rating(Rating),
    SizeBand(SizeBand),
}

impl GroupValue {
    /// The value `record` takes for `key`.
    pub fn of(record: &Record, key: GroupKey) -> Self {
        match key {
            GroupKey::Green => GroupValue::Green(record.green),
            GroupKey::Category => GroupValue::Category(record.category),
            GroupKey::Rating => GroupValue::Rating(record.rating),
            GroupKey::SizeBand => GroupValue::SizeBand(SizeBand::of(record.size_mb)),
        }
    }
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupValue::Green(true) => write!(f, "Green Hosting"),
            GroupValue::Green(false) => write!(f, "Non-Green Hosting"),
            GroupValue::Category(c) => write!(f, "{}", c),
            GroupValue::Rating(r) => write!(f, "{}", r),
            GroupValue::SizeBand(b) => write!(f, "{}", b),
        }
    }
}

/// Descriptive statistics for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionStats {
    pub count: usize,
    pub mean_gco2e: f64,
    pub median_gco2e: f64,
    /// Sample standard deviation; absent for single-record groups.
    pub std_gco2e: Option<f64>,
    pub mean_size_mb: f64,
    pub mean_requests: f64,
    /// Share of the group on green hosting, in percent.
    pub green_pct: f64,
}

impl EmissionStats {
    /// Returns `None` for an empty group.
    fn from_records(records: &[&Record]) -> Option<Self> {
        let gco2e: Vec<f64> = records.iter().map(|r| r.gco2e).collect();
        let sizes: Vec<f64> = records.iter().map(|r| r.size_mb).collect();
        let requests: Vec<f64> = records.iter().map(|r| r.requests as f64).collect();
        let green = records.iter().filter(|r| r.green).count();

        Some(Self {
            count: records.len(),
            mean_gco2e: mean(&gco2e)?,
            median_gco2e: median(&gco2e)?,
            std_gco2e: sample_std(&gco2e),
            mean_size_mb: mean(&sizes)?,
            mean_requests: mean(&requests)?,
            green_pct: green as f64 / records.len() as f64 * 100.0,
        })
    }
}

/// Rating count and share, one entry per rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingShare {
    pub rating: Rating,
    pub count: usize,
    pub pct: f64,
}

/// Headline numbers for a whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetOverview {
    pub records: usize,
    pub green_count: usize,
    pub green_pct: f64,
    pub mean_gco2e: f64,
    pub min_size_mb: f64,
    pub max_size_mb: f64,
    pub mean_size_mb: f64,
}

/// Group records by `key`, keeping record order inside each group.
pub fn group_records(dataset: &Dataset, key: GroupKey) -> BTreeMap<GroupValue, Vec<&Record>> {
    let mut grouped: BTreeMap<GroupValue, Vec<&Record>> = BTreeMap::new();

    for record in dataset {
        grouped
            .entry(GroupValue::of(record, key))
            .or_default()
            .push(record);
    }

    grouped
}

/// Emission statistics per distinct value of `key`.
///
/// Only values that occur in the dataset appear in the result.
pub fn grouped_emission_stats(
    dataset: &Dataset,
    key: GroupKey,
) -> BTreeMap<GroupValue, EmissionStats> {
    group_records(dataset, key)
        .into_iter()
        .filter_map(|(value, records)| EmissionStats::from_records(&records).map(|s| (value, s)))
        .collect()
}

/// Number of records per distinct value of `key`.
pub fn value_counts(dataset: &Dataset, key: GroupKey) -> BTreeMap<GroupValue, usize> {
    let mut counts: BTreeMap<GroupValue, usize> = BTreeMap::new();

    for record in dataset {
        *counts.entry(GroupValue::of(record, key)).or_default() += 1;
    }

    counts
}

/// Share of records per distinct value of `key`, in percent.
pub fn percentage_breakdown(dataset: &Dataset, key: GroupKey) -> BTreeMap<GroupValue, f64> {
    let total = dataset.len() as f64;

    value_counts(dataset, key)
        .into_iter()
        .map(|(value, count)| (value, count as f64 / total * 100.0))
        .collect()
}

/// Pearson correlation between page size and emissions.
pub fn size_emission_correlation(dataset: &Dataset) -> Result<f64, InsufficientData> {
    let sizes: Vec<f64> = dataset.iter().map(|r| r.size_mb).collect();
    let gco2e: Vec<f64> = dataset.iter().map(|r| r.gco2e).collect();
    pearson(&sizes, &gco2e)
}

/// Count and share for every rating, A+ first, including zero counts.
pub fn rating_distribution(dataset: &Dataset) -> Vec<RatingShare> {
    if dataset.is_empty() {
        return Vec::new();
    }

    let counts = value_counts(dataset, GroupKey::Rating);
    let total = dataset.len() as f64;

    Rating::ALL
        .iter()
        .map(|&rating| {
            let count = counts
                .get(&GroupValue::Rating(rating))
                .copied()
                .unwrap_or(0);
            RatingShare {
                rating,
                count,
                pct: count as f64 / total * 100.0,
            }
        })
        .collect()
}

/// How much lower green-hosted mean emissions are than non-green, in percent.
pub fn green_savings_pct(dataset: &Dataset) -> Result<f64, InsufficientData> {
    let stats = grouped_emission_stats(dataset, GroupKey::Green);

    let green = stats
        .get(&GroupValue::Green(true))
        .ok_or_else(|| InsufficientData::new("no green-hosted records"))?;
    let other = stats
        .get(&GroupValue::Green(false))
        .ok_or_else(|| InsufficientData::new("no non-green records"))?;

    if other.mean_gco2e == 0.0 {
        return Err(InsufficientData::new("non-green mean emissions are zero"));
    }

    Ok((other.mean_gco2e - green.mean_gco2e) / other.mean_gco2e * 100.0)
}

/// Mean emissions per category, lowest first.
pub fn category_mean_emissions(dataset: &Dataset) -> Vec<(Category, f64)> {
    let mut means: Vec<(Category, f64)> = grouped_emission_stats(dataset, GroupKey::Category)
        .into_iter()
        .filter_map(|(value, stats)| match value {
            GroupValue::Category(c) => Some((c, stats.mean_gco2e)),
            _ => None,
        })
        .collect();

    means.sort_by(|a, b| a.1.total_cmp(&b.1));
    means
}

/// The `n` categories with the lowest mean emissions.
pub fn greenest_categories(dataset: &Dataset, n: usize) -> Vec<(Category, f64)> {
    let mut means = category_mean_emissions(dataset);
    means.truncate(n);
    means
}

/// Green hosting share per category, highest first.
pub fn category_green_adoption(dataset: &Dataset) -> Vec<(Category, f64)> {
    let mut adoption: Vec<(Category, f64)> = grouped_emission_stats(dataset, GroupKey::Category)
        .into_iter()
        .filter_map(|(value, stats)| match value {
            GroupValue::Category(c) => Some((c, stats.green_pct)),
            _ => None,
        })
        .collect();

    adoption.sort_by(|a, b| b.1.total_cmp(&a.1));
    adoption
}

/// Headline numbers: counts, mean emissions and the size range.
pub fn overview(dataset: &Dataset) -> Result<DatasetOverview, InsufficientData> {
    if dataset.is_empty() {
        return Err(InsufficientData::new("dataset is empty"));
    }

    let sizes: Vec<f64> = dataset.iter().map(|r| r.size_mb).collect();
    let gco2e: Vec<f64> = dataset.iter().map(|r| r.gco2e).collect();
    let green_count = dataset.green_count();

    Ok(DatasetOverview {
        records: dataset.len(),
        green_count,
        green_pct: green_count as f64 / dataset.len() as f64 * 100.0,
        mean_gco2e: mean(&gco2e).unwrap_or_default(),
        min_size_mb: sizes.iter().copied().fold(f64::INFINITY, f64::min),
        max_size_mb: sizes.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean_size_mb: mean(&sizes).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::synthesize;

    fn record(green: bool, gco2e: f64, rating: Rating, category: Category, size_mb: f64) -> Record {
        Record {
            url: "https://example.test".to_string(),
            green,
            gco2e,
            rating,
            category,
            size_mb,
            requests: 40,
        }
    }

    fn small_dataset() -> Dataset {
        Dataset::new(vec![
            record(true, 1.0, Rating::A, Category::Blog, 0.5),
            record(true, 2.0, Rating::B, Category::Blog, 1.5),
            record(false, 4.0, Rating::B, Category::News, 4.0),
            record(false, 6.0, Rating::D, Category::News, 12.0),
        ])
    }

    #[test]
    fn test_empty_dataset_is_tolerated() {
        let empty = Dataset::default();

        for key in [
            GroupKey::Green,
            GroupKey::Category,
            GroupKey::Rating,
            GroupKey::SizeBand,
        ] {
            assert!(grouped_emission_stats(&empty, key).is_empty());
            assert!(percentage_breakdown(&empty, key).is_empty());
            assert!(value_counts(&empty, key).is_empty());
        }
        assert!(size_emission_correlation(&empty).is_err());
        assert!(green_savings_pct(&empty).is_err());
        assert!(overview(&empty).is_err());
        assert!(rating_distribution(&empty).is_empty());
        assert!(greenest_categories(&empty, 3).is_empty());
        assert!(category_green_adoption(&empty).is_empty());
    }

    #[test]
    fn test_all_green_has_single_group() {
        let dataset: Dataset = synthesize(300, 5)
            .iter()
            .cloned()
            .map(|r| Record { green: true, ..r })
            .collect();

        let stats = grouped_emission_stats(&dataset, GroupKey::Green);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[&GroupValue::Green(true)].count, 300);
        assert_eq!(stats[&GroupValue::Green(true)].green_pct, 100.0);
    }

    #[test]
    fn test_grouped_stats_values() {
        let stats = grouped_emission_stats(&small_dataset(), GroupKey::Green);

        let green = &stats[&GroupValue::Green(true)];
        assert_eq!(green.count, 2);
        assert_eq!(green.mean_gco2e, 1.5);
        assert_eq!(green.median_gco2e, 1.5);
        assert!((green.std_gco2e.unwrap() - 0.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(green.mean_size_mb, 1.0);
        assert_eq!(green.mean_requests, 40.0);

        let other = &stats[&GroupValue::Green(false)];
        assert_eq!(other.mean_gco2e, 5.0);
    }

    #[test]
    fn test_single_record_group_has_no_std() {
        let stats = grouped_emission_stats(&small_dataset(), GroupKey::Rating);
        assert_eq!(stats[&GroupValue::Rating(Rating::A)].std_gco2e, None);
    }

    #[test]
    fn test_rating_groups_in_presentation_order_without_empty() {
        let stats = grouped_emission_stats(&small_dataset(), GroupKey::Rating);
        let keys: Vec<GroupValue> = stats.keys().copied().collect();

        assert_eq!(
            keys,
            vec![
                GroupValue::Rating(Rating::A),
                GroupValue::Rating(Rating::B),
                GroupValue::Rating(Rating::D),
            ]
        );
    }

    #[test]
    fn test_size_band_grouping() {
        let counts = value_counts(&small_dataset(), GroupKey::SizeBand);
        assert_eq!(counts[&GroupValue::SizeBand(SizeBand::Small)], 1);
        assert_eq!(counts[&GroupValue::SizeBand(SizeBand::Medium)], 1);
        assert_eq!(counts[&GroupValue::SizeBand(SizeBand::Large)], 1);
        assert_eq!(counts[&GroupValue::SizeBand(SizeBand::VeryLarge)], 1);
    }

    #[test]
    fn test_percentage_breakdown_sums_to_hundred() {
        let dataset = synthesize(777, 11);
        for key in [
            GroupKey::Green,
            GroupKey::Category,
            GroupKey::Rating,
            GroupKey::SizeBand,
        ] {
            let breakdown = percentage_breakdown(&dataset, key);
            let total: f64 = breakdown.values().sum();
            assert!((total - 100.0).abs() < 1e-9, "{:?} sums to {}", key, total);
            assert!(breakdown.values().all(|p| (0.0..=100.0).contains(p)));
        }
    }

    #[test]
    fn test_correlation_in_range() {
        for seed in [1, 2, 3, 42] {
            let r = size_emission_correlation(&synthesize(250, seed)).unwrap();
            assert!((-1.0..=1.0).contains(&r));
        }
    }

    #[test]
    fn test_correlation_insufficient_cases() {
        let one = Dataset::new(vec![record(true, 1.0, Rating::A, Category::Blog, 1.0)]);
        assert!(size_emission_correlation(&one).is_err());

        let flat = Dataset::new(vec![
            record(true, 1.0, Rating::A, Category::Blog, 2.0),
            record(false, 3.0, Rating::B, Category::Blog, 2.0),
        ]);
        assert!(size_emission_correlation(&flat).is_err());
    }

    #[test]
    fn test_correlation_constant_fractional_size() {
        let flat = Dataset::new(vec![
            record(true, 1.0, Rating::A, Category::Blog, 0.1),
            record(false, 2.0, Rating::B, Category::News, 0.1),
            record(true, 4.0, Rating::C, Category::Corporate, 0.1),
        ]);
        assert!(size_emission_correlation(&flat).is_err());
    }

    #[test]
    fn test_rating_distribution_zero_fills() {
        let shares = rating_distribution(&small_dataset());

        assert_eq!(shares.len(), 5);
        assert_eq!(shares[0].rating, Rating::APlus);
        assert_eq!(shares[0].count, 0);
        assert_eq!(shares[2].rating, Rating::B);
        assert_eq!(shares[2].count, 2);
        assert_eq!(shares[2].pct, 50.0);
        let total: f64 = shares.iter().map(|s| s.pct).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_green_savings() {
        let savings = green_savings_pct(&small_dataset()).unwrap();
        assert!((savings - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_category_rankings() {
        let greenest = greenest_categories(&small_dataset(), 1);
        assert_eq!(greenest, vec![(Category::Blog, 1.5)]);

        let adoption = category_green_adoption(&small_dataset());
        assert_eq!(adoption[0], (Category::Blog, 100.0));
        assert_eq!(adoption[1], (Category::News, 0.0));
    }

    #[test]
    fn test_overview() {
        let o = overview(&small_dataset()).unwrap();
        assert_eq!(o.records, 4);
        assert_eq!(o.green_count, 2);
        assert_eq!(o.green_pct, 50.0);
        assert_eq!(o.mean_gco2e, 3.25);
        assert_eq!(o.min_size_mb, 0.5);
        assert_eq!(o.max_size_mb, 12.0);
    }

    #[test]
    fn test_input_not_mutated() {
        let dataset = synthesize(50, 8);
        let before = dataset.clone();
        let _ = grouped_emission_stats(&dataset, GroupKey::Category);
        let _ = percentage_breakdown(&dataset, GroupKey::Rating);
        let _ = size_emission_correlation(&dataset);
        assert_eq!(dataset, before);
    }
}
