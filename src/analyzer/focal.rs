use crate::analyzer::market::{GroupTotal, MarketAggregator};
use crate::analyzer::sort_descending;
use crate::config::{FocalDistributorConfig, ShareThresholds};
use crate::model::{BidRecord, GroupDimension};
use crate::utils::percentage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Headline KPIs of the focal distributor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketShare {
    pub total_market: f64,
    pub total_focal: f64,
    pub share_pct: f64,
    pub focal_count: usize,
    pub total_count: usize,
    /// Share of all submissions made by the focal distributor.
    pub participation_pct: f64,
    /// Lots awarded to the focal distributor among the lots it bid on.
    pub win_rate_pct: f64,
}

/// One group's market aggregate joined with the focal distributor's part of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupPerformance {
    pub key: String,
    pub total_sum: f64,
    pub total_count: usize,
    pub mean: f64,
    pub distributors: usize,
    pub focal_sum: f64,
    pub focal_count: usize,
    pub focal_mean: f64,
    pub focal_lots: usize,
    pub focal_share_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBy {
    Amount,
    Count,
}

pub struct FocalAnalyzer<'a> {
    market: MarketAggregator<'a>,
    focal: &'a FocalDistributorConfig,
}

impl<'a> FocalAnalyzer<'a> {
    /// No-bidder placeholder rows are left out of every figure.
    pub fn new(market: MarketAggregator<'a>, focal: &'a FocalDistributorConfig) -> Self {
        Self {
            market: market.excluding_no_bidders(focal),
            focal,
        }
    }

    fn focal_records(&self) -> Vec<BidRecord> {
        self.market
            .bids()
            .filter(|r| self.focal.is_focal(&r.distributor))
            .cloned()
            .collect()
    }

    pub fn market_share(&self) -> MarketShare {
        let total_count = self.market.bids().count();
        let focal_records = self.focal_records();
        let total_market = self.market.total_market();
        let total_focal = MarketAggregator::from_records(&focal_records).total_market();

        MarketShare {
            total_market,
            total_focal,
            share_pct: percentage(total_focal, total_market),
            focal_count: focal_records.len(),
            total_count,
            participation_pct: percentage(focal_records.len() as f64, total_count as f64),
            win_rate_pct: self.win_rate(&focal_records),
        }
    }

    fn win_rate(&self, focal_records: &[BidRecord]) -> f64 {
        let bid_lots: HashSet<(&str, &str)> = focal_records.iter().map(|r| r.lot_key()).collect();
        let won_lots: HashSet<(&str, &str)> = self
            .market
            .bids()
            .filter(|r| r.awarded_to.as_deref().is_some_and(|w| self.focal.is_focal(w)))
            .map(|r| r.lot_key())
            .collect();
        let won = bid_lots.intersection(&won_lots).count();
        percentage(won as f64, bid_lots.len() as f64)
    }

    /// Every group of `dimension` (largest market first), with the focal
    /// distributor's figures left-joined in. Groups without focal bids get zeros.
    pub fn performance_by_group(&self, dimension: GroupDimension) -> Vec<GroupPerformance> {
        let focal_records = self.focal_records();
        let focal_groups = MarketAggregator::from_records(&focal_records).group_by(dimension);

        self.market
            .group_totals(dimension)
            .into_iter()
            .map(|group| {
                let focal = focal_groups.iter().find(|f| f.key == group.key);
                let focal_lots = focal_records
                    .iter()
                    .filter(|r| dimension.key(r) == group.key)
                    .map(|r| r.lot_item.as_str())
                    .collect::<HashSet<_>>()
                    .len();
                join_focal(group, focal, focal_lots)
            })
            .collect()
    }

    /// 1-based position of the focal distributor among all distributors, 0 if it never bid.
    /// Equal aggregates rank in the order distributors first appear in the data.
    pub fn rank(&self, by: RankBy) -> usize {
        let mut totals = self.market.distributor_totals();
        match by {
            RankBy::Amount => sort_descending(&mut totals, |t| t.sum),
            RankBy::Count => sort_descending(&mut totals, |t| t.count as f64),
        }
        totals
            .iter()
            .position(|t| self.focal.is_focal(&t.distributor))
            .map_or(0, |index| index + 1)
    }
}

fn join_focal(
    group: GroupTotal,
    focal: Option<&GroupTotal>,
    focal_lots: usize,
) -> GroupPerformance {
    let (focal_sum, focal_count, focal_mean) =
        focal.map_or((0.0, 0, 0.0), |f| (f.sum, f.count, f.mean));
    GroupPerformance {
        focal_share_pct: percentage(focal_sum, group.sum),
        key: group.key,
        total_sum: group.sum,
        total_count: group.count,
        mean: group.mean,
        distributors: group.distributors,
        focal_sum,
        focal_count,
        focal_mean,
        focal_lots,
    }
}

/// Splits a performance table into strong (share >= strong) and weak (share < weak) groups.
pub fn classify_performance(
    table: &[GroupPerformance],
    thresholds: &ShareThresholds,
) -> (Vec<GroupPerformance>, Vec<GroupPerformance>) {
    let strong = table
        .iter()
        .filter(|g| g.focal_share_pct >= thresholds.strong)
        .cloned()
        .collect();
    let weak = table
        .iter()
        .filter(|g| g.focal_share_pct < thresholds.weak)
        .cloned()
        .collect();
    (strong, weak)
}

/// Groups where the focal distributor submitted anything.
pub fn focal_active_groups(table: &[GroupPerformance]) -> Vec<GroupPerformance> {
    table.iter().filter(|g| g.focal_sum > 0.0).cloned().collect()
}

/// Mean focal share over the groups where the focal distributor is active.
pub fn average_focal_share(table: &[GroupPerformance]) -> f64 {
    let active = focal_active_groups(table);
    if active.is_empty() {
        return 0.0;
    }
    active.iter().map(|g| g.focal_share_pct).sum::<f64>() / active.len() as f64
}
