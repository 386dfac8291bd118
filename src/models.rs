//! Data models for the carbon dataset.
//!
//! This module contains the record schema shared by every stage: the
//! collector writes it, the aggregator and renderers read it back.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Carbon intensity rating, best first.
///
/// Declaration order is the presentation order, so `Ord` sorts A+ before D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rating {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
}

impl Rating {
    /// All ratings in presentation order.
    pub const ALL: [Rating; 5] = [Rating::APlus, Rating::A, Rating::B, Rating::C, Rating::D];

    /// Sampling weight used when synthesizing records.
    pub fn weight(&self) -> f64 {
        match self {
            Rating::APlus => 0.1,
            Rating::A => 0.2,
            Rating::B => 0.3,
            Rating::C => 0.3,
            Rating::D => 0.1,
        }
    }

    /// Bar color used by the rating distribution chart, as RGB.
    pub fn color_rgb(&self) -> (u8, u8, u8) {
        match self {
            Rating::APlus => (0x2E, 0x8B, 0x57),
            Rating::A => (0x32, 0xCD, 0x32),
            Rating::B => (0xFF, 0xD7, 0x00),
            Rating::C => (0xFF, 0x8C, 0x00),
            Rating::D => (0xDC, 0x14, 0x3C),
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rating::APlus => write!(f, "A+"),
            Rating::A => write!(f, "A"),
            Rating::B => write!(f, "B"),
            Rating::C => write!(f, "C"),
            Rating::D => write!(f, "D"),
        }
    }
}

/// Kind of website a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Ecommerce,
    Blog,
    Portfolio,
    Corporate,
    News,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Ecommerce,
        Category::Blog,
        Category::Portfolio,
        Category::Corporate,
        Category::News,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Ecommerce => write!(f, "ecommerce"),
            Category::Blog => write!(f, "blog"),
            Category::Portfolio => write!(f, "portfolio"),
            Category::Corporate => write!(f, "corporate"),
            Category::News => write!(f, "news"),
        }
    }
}

/// Page weight bucket used for grouped statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeBand {
    /// Up to 1 MB
    Small,
    /// Over 1 MB, up to 3 MB
    Medium,
    /// Over 3 MB, up to 10 MB
    Large,
    /// Over 10 MB
    VeryLarge,
}

impl SizeBand {
    /// Classify a page size in megabytes.
    pub fn of(size_mb: f64) -> Self {
        if size_mb <= 1.0 {
            SizeBand::Small
        } else if size_mb <= 3.0 {
            SizeBand::Medium
        } else if size_mb <= 10.0 {
            SizeBand::Large
        } else {
            SizeBand::VeryLarge
        }
    }
}

impl fmt::Display for SizeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeBand::Small => write!(f, "Small (<1MB)"),
            SizeBand::Medium => write!(f, "Medium (1-3MB)"),
            SizeBand::Large => write!(f, "Large (3-10MB)"),
            SizeBand::VeryLarge => write!(f, "Very Large (>10MB)"),
        }
    }
}

/// One website observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Site identifier.
    pub url: String,
    /// Whether the site is served from green hosting.
    #[serde(deserialize_with = "deserialize_flexible_bool")]
    pub green: bool,
    /// Grams of CO2 per page view.
    pub gco2e: f64,
    /// Carbon intensity rating.
    pub rating: Rating,
    /// Site type.
    pub category: Category,
    /// Page weight in megabytes.
    pub size_mb: f64,
    /// Number of HTTP requests per page view.
    pub requests: u32,
}

/// Accepts `true`/`false` as well as the capitalized spelling pandas writes.
fn deserialize_flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim() {
        "true" | "True" | "TRUE" | "1" => Ok(true),
        "false" | "False" | "FALSE" | "0" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid boolean value: {}",
            other
        ))),
    }
}

/// An ordered, immutable sequence of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Number of records on green hosting.
    pub fn green_count(&self) -> usize {
        self.records.iter().filter(|r| r.green).count()
    }
}

impl FromIterator<Record> for Dataset {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_ordering() {
        assert!(Rating::APlus < Rating::A);
        assert!(Rating::A < Rating::B);
        assert!(Rating::C < Rating::D);
    }

    #[test]
    fn test_rating_weights_sum_to_one() {
        let total: f64 = Rating::ALL.iter().map(|r| r.weight()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rating_display() {
        assert_eq!(Rating::APlus.to_string(), "A+");
        assert_eq!(Rating::D.to_string(), "D");
    }

    #[test]
    fn test_size_band_boundaries() {
        assert_eq!(SizeBand::of(0.2), SizeBand::Small);
        assert_eq!(SizeBand::of(1.0), SizeBand::Small);
        assert_eq!(SizeBand::of(1.5), SizeBand::Medium);
        assert_eq!(SizeBand::of(3.0), SizeBand::Medium);
        assert_eq!(SizeBand::of(9.9), SizeBand::Large);
        assert_eq!(SizeBand::of(42.0), SizeBand::VeryLarge);
    }

    #[test]
    fn test_dataset_green_count() {
        let record = Record {
            url: "https://example0.com".to_string(),
            green: true,
            gco2e: 1.0,
            rating: Rating::A,
            category: Category::Blog,
            size_mb: 0.5,
            requests: 10,
        };
        let dataset: Dataset = vec![
            record.clone(),
            Record {
                green: false,
                ..record.clone()
            },
            record,
        ]
        .into_iter()
        .collect();

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.green_count(), 2);
    }
}
