// Analyzer module: market aggregation, focal-distributor KPIs, competition and opportunities.

pub mod competition;
pub mod focal;
pub mod market;
pub mod opportunity;

use crate::config::{AnalysisConfig, FocalDistributorConfig};
use crate::model::{AnalysisError, Column, Dataset, GroupDimension};
use chrono::{DateTime, Utc};
use competition::{ComparisonRow, CompetitionRanker, CompetitorRow, GroupPosition, Position};
use focal::{FocalAnalyzer, GroupPerformance, MarketShare, RankBy};
use market::{AmountSummary, DistributorAmount, GroupTotal, MarketAggregator};
use opportunity::{GrowthSummary, Opportunity, OpportunityEstimator};
use serde::Serialize;
use tracing::info;

/// Columns the full analysis reads.
pub const ANALYSIS_COLUMNS: [Column; 5] = [
    Column::ProductLine,
    Column::Category,
    Column::LotItem,
    Column::Distributor,
    Column::SubmittedAmount,
];

/// Stable sort, largest key first. Equal keys keep their current order.
pub(crate) fn sort_descending<T>(items: &mut [T], key: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| key(b).total_cmp(&key(a)));
}

/// Everything the engine computes for one dataset.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub focal_distributor: String,
    pub market_share: MarketShare,
    pub rank_by_amount: usize,
    pub rank_by_count: usize,
    pub overall_position: Position,
    pub market_distribution: Vec<DistributorAmount>,
    pub amount_summary: AmountSummary,
    pub top_product_lines: Vec<GroupTotal>,
    pub performance_by_product_line: Vec<GroupPerformance>,
    pub performance_by_category: Vec<GroupPerformance>,
    pub strong_groups: Vec<GroupPerformance>,
    pub weak_groups: Vec<GroupPerformance>,
    pub average_focal_share: f64,
    pub category_positions: Vec<GroupPosition>,
    pub competitors: Vec<CompetitorRow>,
    pub comparison: Vec<ComparisonRow>,
    pub opportunities: Vec<Opportunity>,
    pub growth: GrowthSummary,
}

/// Runs every engine component over a dataset for one focal distributor.
pub struct BidAnalyzer {
    focal: FocalDistributorConfig,
    config: AnalysisConfig,
}

impl BidAnalyzer {
    pub fn new(focal: FocalDistributorConfig, config: AnalysisConfig) -> Self {
        Self { focal, config }
    }

    pub fn focal(&self) -> &FocalDistributorConfig {
        &self.focal
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Fails fast on missing columns, and on a dataset with no usable rows.
    pub fn analyze(&self, dataset: &Dataset) -> Result<AnalysisReport, AnalysisError> {
        dataset.require(&ANALYSIS_COLUMNS)?;
        let market = MarketAggregator::new(dataset)?.excluding_no_bidders(&self.focal);
        if dataset.is_empty() {
            return Err(AnalysisError::EmptyDataset);
        }

        let focal_analyzer = FocalAnalyzer::new(market, &self.focal);
        let market_share = focal_analyzer.market_share();
        info!(
            "Market {:.0} | {} share {:.2}% over {} rows",
            market_share.total_market,
            self.focal.name,
            market_share.share_pct,
            market_share.total_count
        );

        let performance_by_product_line =
            focal_analyzer.performance_by_group(GroupDimension::ProductLine);
        let performance_by_category =
            focal_analyzer.performance_by_group(GroupDimension::Category);
        let (strong_groups, weak_groups) =
            focal::classify_performance(&performance_by_product_line, &self.config.shares);

        let ranker = CompetitionRanker::new(market, &self.focal);
        let competitors = ranker.competitor_table();
        info!("Ranked {} competitors", competitors.len());

        let estimator = OpportunityEstimator::new(dataset.records(), &self.focal, &self.config);
        let opportunities = estimator.opportunities();
        let growth = estimator.growth_summary(&opportunities, &performance_by_product_line);
        info!(
            "Found {} unbid lots worth {:.0} ({} high priority)",
            growth.opportunity_count, growth.total_estimated_value, growth.high_priority_count
        );

        Ok(AnalysisReport {
            generated_at: Utc::now(),
            focal_distributor: self.focal.name.clone(),
            rank_by_amount: focal_analyzer.rank(RankBy::Amount),
            rank_by_count: focal_analyzer.rank(RankBy::Count),
            overall_position: competition::classify_position(
                market_share.share_pct,
                &self.config.tiers,
            ),
            market_share,
            market_distribution: market.market_distribution(self.config.others_threshold),
            amount_summary: market.amount_summary(),
            top_product_lines: market
                .top_groups(GroupDimension::ProductLine, self.config.top_groups),
            average_focal_share: focal::average_focal_share(&performance_by_product_line),
            category_positions: ranker
                .position_by_group(GroupDimension::Category, &self.config.tiers),
            comparison: ranker.top_n_comparison(self.config.top_n, RankBy::Amount),
            performance_by_product_line,
            performance_by_category,
            strong_groups,
            weak_groups,
            competitors,
            opportunities,
            growth,
        })
    }
}
