use crate::analyzer::sort_descending;
use crate::config::FocalDistributorConfig;
use crate::model::{AnalysisError, BidRecord, Column, Dataset, GroupDimension};
use crate::utils::quantile_sorted;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;

/// Label of the synthetic entry collecting distributors past the display threshold.
pub const OTHERS_LABEL: &str = "OTHERS";

/// Aggregate of one group key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub sum: f64,
    pub count: usize,
    pub mean: f64,
    pub distributors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributorAmount {
    pub distributor: String,
    pub sum: f64,
}

/// Per-distributor totals, in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributorTotal {
    pub distributor: String,
    pub sum: f64,
    pub count: usize,
}

/// Descriptive statistics of `submitted_amount`. All zero for an empty dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AmountSummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Default)]
struct Bucket<'a> {
    sum: f64,
    count: usize,
    distributors: HashSet<&'a str>,
}

/// Groups records by `key`, keeping groups in the order their first row appears.
fn bucket_by<'a>(
    records: impl IntoIterator<Item = &'a BidRecord>,
    key: impl Fn(&'a BidRecord) -> &'a str,
) -> IndexMap<&'a str, Bucket<'a>> {
    let mut buckets: IndexMap<&str, Bucket> = IndexMap::new();
    for record in records {
        let bucket = buckets.entry(key(record)).or_default();
        bucket.sum += record.submitted_amount;
        bucket.count += 1;
        bucket.distributors.insert(record.distributor.as_str());
    }
    buckets
}

fn to_group_totals(buckets: IndexMap<&str, Bucket>) -> Vec<GroupTotal> {
    buckets
        .into_iter()
        .map(|(key, bucket)| GroupTotal {
            key: key.to_string(),
            sum: bucket.sum,
            count: bucket.count,
            mean: if bucket.count == 0 { 0.0 } else { bucket.sum / bucket.count as f64 },
            distributors: bucket.distributors.len(),
        })
        .collect()
}

/// Market-wide totals and groupings over a normalized record set.
///
/// Once built with [`MarketAggregator::excluding_no_bidders`], "no bidder"
/// placeholder rows take no part in any total, grouping or distribution.
#[derive(Debug, Clone, Copy)]
pub struct MarketAggregator<'a> {
    records: &'a [BidRecord],
    placeholders: Option<&'a FocalDistributorConfig>,
}

impl<'a> MarketAggregator<'a> {
    /// Fails when the dataset has no distributor or amount column at all.
    pub fn new(dataset: &'a Dataset) -> Result<Self, AnalysisError> {
        dataset.require(&[Column::Distributor, Column::SubmittedAmount])?;
        Ok(Self::from_records(dataset.records()))
    }

    pub fn from_records(records: &'a [BidRecord]) -> Self {
        Self {
            records,
            placeholders: None,
        }
    }

    /// Skips rows whose distributor is one of `focal`'s no-bidder phrases.
    pub fn excluding_no_bidders(self, focal: &'a FocalDistributorConfig) -> Self {
        Self {
            placeholders: Some(focal),
            ..self
        }
    }

    /// Every row, placeholders included.
    pub fn records(&self) -> &'a [BidRecord] {
        self.records
    }

    /// Rows that represent an actual submission.
    pub fn bids(self) -> impl Iterator<Item = &'a BidRecord> {
        let placeholders = self.placeholders;
        self.records
            .iter()
            .filter(move |r| placeholders.is_none_or(|p| !p.is_no_bidder(&r.distributor)))
    }

    pub fn total_market(&self) -> f64 {
        self.bids().fold(0.0, |acc, r| acc + r.submitted_amount)
    }

    /// Per-group aggregates in first-seen order.
    pub fn group_by(&self, dimension: GroupDimension) -> Vec<GroupTotal> {
        to_group_totals(bucket_by(self.bids(), |r| dimension.key(r)))
    }

    /// Per-group aggregates, largest sum first. Equal sums keep first-seen order.
    pub fn group_totals(&self, dimension: GroupDimension) -> Vec<GroupTotal> {
        let mut groups = self.group_by(dimension);
        sort_descending(&mut groups, |g| g.sum);
        groups
    }

    pub fn top_groups(&self, dimension: GroupDimension, n: usize) -> Vec<GroupTotal> {
        let mut groups = self.group_totals(dimension);
        groups.truncate(n);
        groups
    }

    /// Aggregates by `by` inside the single group `dimension == key`
    /// (e.g. the lots of one product line).
    pub fn breakdown_within(
        &self,
        dimension: GroupDimension,
        key: &str,
        by: GroupDimension,
    ) -> Vec<GroupTotal> {
        let inside = self.bids().filter(|r| dimension.key(r) == key);
        let mut groups = to_group_totals(bucket_by(inside, |r| by.key(r)));
        sort_descending(&mut groups, |g| g.sum);
        groups
    }

    pub fn distributor_totals(&self) -> Vec<DistributorTotal> {
        bucket_by(self.bids(), |r| r.distributor.as_str())
            .into_iter()
            .map(|(distributor, bucket)| DistributorTotal {
                distributor: distributor.to_string(),
                sum: bucket.sum,
                count: bucket.count,
            })
            .collect()
    }

    /// Distributor split of one group, largest first.
    pub fn distributors_in_group(
        &self,
        dimension: GroupDimension,
        key: &str,
    ) -> Vec<DistributorAmount> {
        let inside = self.bids().filter(|r| dimension.key(r) == key);
        let mut amounts: Vec<DistributorAmount> = bucket_by(inside, |r| r.distributor.as_str())
            .into_iter()
            .map(|(distributor, bucket)| DistributorAmount {
                distributor: distributor.to_string(),
                sum: bucket.sum,
            })
            .collect();
        sort_descending(&mut amounts, |d| d.sum);
        amounts
    }

    /// Distributor amounts, largest first, with everything past the first
    /// `keep` distributors merged into a single `OTHERS` entry.
    pub fn market_distribution(&self, keep: usize) -> Vec<DistributorAmount> {
        let mut amounts: Vec<DistributorAmount> = self
            .distributor_totals()
            .into_iter()
            .map(|t| DistributorAmount {
                distributor: t.distributor,
                sum: t.sum,
            })
            .collect();
        sort_descending(&mut amounts, |d| d.sum);

        if amounts.len() <= keep {
            return amounts;
        }
        let others: f64 = amounts.split_off(keep).iter().map(|d| d.sum).sum();
        if others > 0.0 {
            amounts.push(DistributorAmount {
                distributor: OTHERS_LABEL.to_string(),
                sum: others,
            });
        }
        amounts
    }

    pub fn amount_summary(&self) -> AmountSummary {
        let mut amounts: Vec<f64> = self.bids().map(|r| r.submitted_amount).collect();
        if amounts.is_empty() {
            return AmountSummary::default();
        }
        amounts.sort_by(|a, b| a.total_cmp(b));

        let count = amounts.len();
        let mean = amounts.iter().sum::<f64>() / count as f64;
        // Sample standard deviation; a single row has none.
        let std_dev = if count < 2 {
            0.0
        } else {
            (amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt()
        };

        AmountSummary {
            count,
            mean,
            std_dev,
            min: amounts[0],
            q1: quantile_sorted(&amounts, 0.25),
            median: quantile_sorted(&amounts, 0.5),
            q3: quantile_sorted(&amounts, 0.75),
            max: amounts[count - 1],
        }
    }
}
