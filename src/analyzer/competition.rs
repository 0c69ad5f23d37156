use crate::analyzer::focal::{FocalAnalyzer, GroupPerformance, RankBy};
use crate::analyzer::market::MarketAggregator;
use crate::analyzer::sort_descending;
use crate::config::{FocalDistributorConfig, PositionTiers};
use crate::model::GroupDimension;
use crate::utils::percentage;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitorRow {
    pub distributor: String,
    pub sum: f64,
    pub count: usize,
    pub product_lines: usize,
    pub categories: usize,
    pub lot_items: usize,
    /// Share of the whole market, focal distributor included.
    pub share_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Position {
    Leader,
    StrongCompetitor,
    ModerateCompetitor,
    Marginal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParticipantType {
    Focal,
    Competitor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub distributor: String,
    pub sum: f64,
    pub count: usize,
    #[serde(rename = "type")]
    pub kind: ParticipantType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupPosition {
    pub key: String,
    pub focal_share_pct: f64,
    pub position: Position,
}

/// Tiers a market share: `>= leader` Leader, `>= strong` StrongCompetitor,
/// `>= moderate` ModerateCompetitor, otherwise Marginal.
pub fn classify_position(focal_share_pct: f64, tiers: &PositionTiers) -> Position {
    if focal_share_pct >= tiers.leader {
        Position::Leader
    } else if focal_share_pct >= tiers.strong {
        Position::StrongCompetitor
    } else if focal_share_pct >= tiers.moderate {
        Position::ModerateCompetitor
    } else {
        Position::Marginal
    }
}

#[derive(Default)]
struct Coverage<'a> {
    sum: f64,
    count: usize,
    product_lines: HashSet<&'a str>,
    categories: HashSet<&'a str>,
    lot_items: HashSet<&'a str>,
}

pub struct CompetitionRanker<'a> {
    market: MarketAggregator<'a>,
    focal: &'a FocalDistributorConfig,
}

impl<'a> CompetitionRanker<'a> {
    pub fn new(market: MarketAggregator<'a>, focal: &'a FocalDistributorConfig) -> Self {
        Self {
            market: market.excluding_no_bidders(focal),
            focal,
        }
    }

    /// Every distributor except the focal one and the no-bidder placeholders,
    /// largest amount first.
    pub fn competitor_table(&self) -> Vec<CompetitorRow> {
        let total_market = self.market.total_market();
        let mut coverage: IndexMap<&str, Coverage> = IndexMap::new();
        for record in self.market.bids() {
            if self.focal.is_focal(&record.distributor) {
                continue;
            }
            let entry = coverage.entry(record.distributor.as_str()).or_default();
            entry.sum += record.submitted_amount;
            entry.count += 1;
            entry.product_lines.insert(&record.product_line);
            entry.categories.insert(&record.category);
            entry.lot_items.insert(&record.lot_item);
        }

        let mut rows: Vec<CompetitorRow> = coverage
            .into_iter()
            .map(|(distributor, c)| CompetitorRow {
                distributor: distributor.to_string(),
                sum: c.sum,
                count: c.count,
                product_lines: c.product_lines.len(),
                categories: c.categories.len(),
                lot_items: c.lot_items.len(),
                share_pct: percentage(c.sum, total_market),
            })
            .collect();
        sort_descending(&mut rows, |r| r.sum);
        rows
    }

    /// The focal distributor's totals followed by the `n` largest competitors.
    pub fn top_n_comparison(&self, n: usize, by: RankBy) -> Vec<ComparisonRow> {
        let share = FocalAnalyzer::new(self.market, self.focal).market_share();
        let mut competitors = self.competitor_table();
        if by == RankBy::Count {
            sort_descending(&mut competitors, |r| r.count as f64);
        }

        let mut rows = vec![ComparisonRow {
            distributor: self.focal.name.clone(),
            sum: share.total_focal,
            count: share.focal_count,
            kind: ParticipantType::Focal,
        }];
        rows.extend(competitors.into_iter().take(n).map(|c| ComparisonRow {
            distributor: c.distributor,
            sum: c.sum,
            count: c.count,
            kind: ParticipantType::Competitor,
        }));
        rows
    }

    pub fn overall_position(&self, tiers: &PositionTiers) -> Position {
        let share = FocalAnalyzer::new(self.market, self.focal).market_share();
        classify_position(share.share_pct, tiers)
    }

    /// Focal position inside each group of `dimension`.
    pub fn position_by_group(
        &self,
        dimension: GroupDimension,
        tiers: &PositionTiers,
    ) -> Vec<GroupPosition> {
        FocalAnalyzer::new(self.market, self.focal)
            .performance_by_group(dimension)
            .into_iter()
            .map(|g: GroupPerformance| GroupPosition {
                position: classify_position(g.focal_share_pct, tiers),
                focal_share_pct: g.focal_share_pct,
                key: g.key,
            })
            .collect()
    }
}
