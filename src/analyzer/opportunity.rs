// Unclaimed lots: detection, price estimation and prioritisation.
use crate::analyzer::focal::GroupPerformance;
use crate::analyzer::sort_descending;
use crate::config::{AnalysisConfig, ConfidenceWeights, FocalDistributorConfig, PriorityCutoffs};
use crate::model::BidRecord;
use crate::utils::median;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnbidReason {
    /// Only "no bidder" placeholder rows exist for the lot.
    NoBidder,
    /// Competitors bid, the focal distributor did not.
    FocalAbsent,
}

/// A lot, scoped by product line and category, the focal distributor has no bid on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnbidGroup {
    pub product_line: String,
    pub category: String,
    pub lot_item: String,
    pub reason: UnbidReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn weight(&self, weights: &ConfidenceWeights) -> f64 {
        match self {
            Confidence::High => weights.high,
            Confidence::Medium => weights.medium,
            Confidence::Low => weights.low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EstimationMethod {
    #[serde(rename = "Median of similar items")]
    SimilarItems,
    #[serde(rename = "Category median")]
    CategoryMedian,
    #[serde(rename = "Global market estimate")]
    GlobalMarket,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceEstimate {
    pub estimated_amount: f64,
    pub confidence: Confidence,
    pub method: EstimationMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
    pub group: UnbidGroup,
    pub estimate: PriceEstimate,
    pub score: f64,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthSummary {
    pub opportunity_count: usize,
    pub total_estimated_value: f64,
    pub high_priority_count: usize,
    pub underexploited_groups: Vec<String>,
    pub top_recommendation: Option<Opportunity>,
}

/// Text before the first `-` of a lot description ("ANALYSEUR-5P" → "ANALYSEUR").
pub fn prefix_token(lot_item: &str) -> &str {
    lot_item
        .split_once('-')
        .map_or(lot_item, |(prefix, _)| prefix)
        .trim()
}

/// Confidence-weighted estimate rescaled into score units.
pub fn score_opportunity(
    estimated_amount: f64,
    confidence: Confidence,
    weights: &ConfidenceWeights,
    scale: f64,
) -> f64 {
    if scale == 0.0 {
        return 0.0;
    }
    estimated_amount * confidence.weight(weights) / scale
}

/// `[0, medium)` Low, `[medium, high)` Medium, `[high, ∞)` High.
pub fn prioritize(score: f64, cutoffs: &PriorityCutoffs) -> Priority {
    if score >= cutoffs.high {
        Priority::High
    } else if score >= cutoffs.medium {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Highest score first; equal scores keep their input order.
pub fn rank_opportunities(mut opportunities: Vec<Opportunity>) -> Vec<Opportunity> {
    sort_descending(&mut opportunities, |o| o.score);
    opportunities
}

#[derive(Default)]
struct LotState {
    real_bid: bool,
    focal_bid: bool,
}

pub struct OpportunityEstimator<'a> {
    records: &'a [BidRecord],
    focal: &'a FocalDistributorConfig,
    config: &'a AnalysisConfig,
}

impl<'a> OpportunityEstimator<'a> {
    pub fn new(
        records: &'a [BidRecord],
        focal: &'a FocalDistributorConfig,
        config: &'a AnalysisConfig,
    ) -> Self {
        Self {
            records,
            focal,
            config,
        }
    }

    /// Lots without a focal bid, in the order they first appear.
    pub fn find_unbid_groups(&self) -> Vec<UnbidGroup> {
        let mut lots: IndexMap<(&str, &str, &str), LotState> = IndexMap::new();
        for record in self.records {
            let key = (
                record.product_line.as_str(),
                record.category.as_str(),
                record.lot_item.as_str(),
            );
            let state = lots.entry(key).or_default();
            if self.focal.is_no_bidder(&record.distributor) {
                continue;
            }
            state.real_bid = true;
            if self.focal.is_focal(&record.distributor) {
                state.focal_bid = true;
            }
        }

        lots.into_iter()
            .filter(|(_, state)| !state.focal_bid)
            .map(|((product_line, category, lot_item), state)| UnbidGroup {
                product_line: product_line.to_string(),
                category: category.to_string(),
                lot_item: lot_item.to_string(),
                reason: if state.real_bid {
                    UnbidReason::FocalAbsent
                } else {
                    UnbidReason::NoBidder
                },
            })
            .collect()
    }

    fn bids(&self) -> impl Iterator<Item = &'a BidRecord> {
        let focal = self.focal;
        self.records
            .iter()
            .filter(move |r| !focal.is_no_bidder(&r.distributor))
    }

    /// Three-tier fallback, first match wins:
    /// median of same-category items sharing the lot prefix (at least `min_similar` of them),
    /// then the category median, then the discounted global median.
    /// Placeholder rows carry no offered price and are not sampled.
    pub fn estimate_price(&self, category: &str, lot_item: &str) -> PriceEstimate {
        let estimation = &self.config.estimation;
        let prefix = prefix_token(lot_item);

        let in_category: Vec<&BidRecord> =
            self.bids().filter(|r| r.category == category).collect();
        let similar: Vec<f64> = in_category
            .iter()
            .filter(|r| prefix_token(&r.lot_item) == prefix)
            .map(|r| r.submitted_amount)
            .collect();

        if similar.len() >= estimation.min_similar {
            if let Some(amount) = median(&similar) {
                return PriceEstimate {
                    estimated_amount: amount,
                    confidence: Confidence::High,
                    method: EstimationMethod::SimilarItems,
                };
            }
        }

        let category_amounts: Vec<f64> = in_category.iter().map(|r| r.submitted_amount).collect();
        if let Some(amount) = median(&category_amounts) {
            return PriceEstimate {
                estimated_amount: amount,
                confidence: Confidence::Medium,
                method: EstimationMethod::CategoryMedian,
            };
        }

        let all_amounts: Vec<f64> = self.bids().map(|r| r.submitted_amount).collect();
        PriceEstimate {
            estimated_amount: estimation.global_discount * median(&all_amounts).unwrap_or(0.0),
            confidence: Confidence::Low,
            method: EstimationMethod::GlobalMarket,
        }
    }

    /// Every unbid lot, estimated, scored and ranked.
    pub fn opportunities(&self) -> Vec<Opportunity> {
        let opportunities = self
            .find_unbid_groups()
            .into_iter()
            .map(|group| {
                let estimate = self.estimate_price(&group.category, &group.lot_item);
                let score = score_opportunity(
                    estimate.estimated_amount,
                    estimate.confidence,
                    &self.config.confidence,
                    self.config.estimation.score_scale,
                );
                Opportunity {
                    priority: prioritize(score, &self.config.priority),
                    group,
                    estimate,
                    score,
                }
            })
            .collect();
        rank_opportunities(opportunities)
    }

    /// Roll-up of ranked opportunities plus the groups where the focal share
    /// is below the weak threshold.
    pub fn growth_summary(
        &self,
        ranked: &[Opportunity],
        performance: &[GroupPerformance],
    ) -> GrowthSummary {
        GrowthSummary {
            opportunity_count: ranked.len(),
            total_estimated_value: ranked
                .iter()
                .fold(0.0, |acc, o| acc + o.estimate.estimated_amount),
            high_priority_count: ranked.iter().filter(|o| o.priority == Priority::High).count(),
            underexploited_groups: performance
                .iter()
                .filter(|g| g.focal_share_pct < self.config.shares.weak)
                .map(|g| g.key.clone())
                .collect(),
            top_recommendation: ranked.first().cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    const FOCAL: &str = "TECHNOLOGIES SERVICES";

    fn estimator_for<'a>(
        records: &'a [BidRecord],
        focal: &'a FocalDistributorConfig,
        config: &'a AnalysisConfig,
    ) -> OpportunityEstimator<'a> {
        OpportunityEstimator::new(records, focal, config)
    }

    #[test]
    fn prefix_is_text_before_first_dash() {
        assert_eq!(prefix_token("ANALYSEUR-5P-AUTO"), "ANALYSEUR");
        assert_eq!(prefix_token("CENTRIFUGEUSE "), "CENTRIFUGEUSE");
        assert_eq!(prefix_token("ECHO - PORTABLE"), "ECHO");
    }

    #[test]
    fn finds_lots_without_focal_bid() {
        let records = vec![
            BidRecord::new("HEMATO", "BIOLOGY", "CBC-5P", FOCAL, 100.0),
            BidRecord::new("HEMATO", "BIOLOGY", "CBC-5P", "ACME", 120.0),
            BidRecord::new("HEMATO", "BIOLOGY", "CBC-3P", "ACME", 80.0),
            BidRecord::new("BLOC", "SURGERY", "TABLE", "No Bidder", 50.0),
            BidRecord::new("HEMATO", "BIOLOGY", "CBC-3P", "BETA", 90.0),
        ];
        let focal = FocalDistributorConfig::new(FOCAL);
        let config = AnalysisConfig::default();
        let unbid = estimator_for(&records, &focal, &config).find_unbid_groups();

        assert_eq!(unbid.len(), 2);
        assert_eq!(unbid[0].lot_item, "CBC-3P");
        assert_eq!(unbid[0].reason, UnbidReason::FocalAbsent);
        assert_eq!(unbid[1].lot_item, "TABLE");
        assert_eq!(unbid[1].reason, UnbidReason::NoBidder);
    }

    #[test]
    fn same_lot_name_in_other_product_line_is_a_separate_group() {
        let records = vec![
            BidRecord::new("HEMATO", "BIOLOGY", "KIT", FOCAL, 10.0),
            BidRecord::new("BIOCHIMIE", "BIOLOGY", "KIT", "ACME", 10.0),
        ];
        let focal = FocalDistributorConfig::new(FOCAL);
        let config = AnalysisConfig::default();
        let unbid = estimator_for(&records, &focal, &config).find_unbid_groups();
        assert_eq!(unbid.len(), 1);
        assert_eq!(unbid[0].product_line, "BIOCHIMIE");
    }

    #[test]
    fn similar_items_give_high_confidence() {
        let records = vec![
            BidRecord::new("HEMATO", "BIOLOGY", "ANALYSEUR-5P", "ACME", 100.0),
            BidRecord::new("HEMATO", "BIOLOGY", "ANALYSEUR-3P", "BETA", 300.0),
            BidRecord::new("HEMATO", "BIOLOGY", "CENTRIFUGEUSE", "BETA", 5000.0),
        ];
        let focal = FocalDistributorConfig::new(FOCAL);
        let config = AnalysisConfig::default();
        let estimate =
            estimator_for(&records, &focal, &config).estimate_price("BIOLOGY", "ANALYSEUR-5P");

        assert_eq!(estimate.confidence, Confidence::High);
        assert_eq!(estimate.method, EstimationMethod::SimilarItems);
        assert_relative_eq!(estimate.estimated_amount, 200.0);
    }

    #[test]
    fn single_similar_item_falls_back_to_category_median() {
        let records = vec![
            BidRecord::new("HEMATO", "BIOLOGY", "ANALYSEUR-5P", "ACME", 100.0),
            BidRecord::new("HEMATO", "BIOLOGY", "CENTRIFUGEUSE", "BETA", 400.0),
            BidRecord::new("HEMATO", "BIOLOGY", "MICROSCOPE", "BETA", 200.0),
            BidRecord::new("HEMATO", "BIOLOGY", "AUTOMATE-X", "GAMMA", 300.0),
            BidRecord::new("BLOC", "SURGERY", "TABLE", "GAMMA", 9000.0),
        ];
        let focal = FocalDistributorConfig::new(FOCAL);
        let config = AnalysisConfig::default();
        let estimate =
            estimator_for(&records, &focal, &config).estimate_price("BIOLOGY", "ANALYSEUR-5P");

        assert_eq!(estimate.confidence, Confidence::Medium);
        assert_eq!(estimate.method, EstimationMethod::CategoryMedian);
        assert_relative_eq!(estimate.estimated_amount, 250.0);
    }

    #[test]
    fn unknown_category_uses_discounted_global_median() {
        let records = vec![
            BidRecord::new("HEMATO", "BIOLOGY", "A", "ACME", 100.0),
            BidRecord::new("BLOC", "SURGERY", "B", "ACME", 200.0),
            BidRecord::new("BLOC", "SURGERY", "C", "ACME", 300.0),
        ];
        let focal = FocalDistributorConfig::new(FOCAL);
        let config = AnalysisConfig::default();
        let estimate =
            estimator_for(&records, &focal, &config).estimate_price("IMAGING", "SCANNER");

        assert_eq!(estimate.confidence, Confidence::Low);
        assert_eq!(estimate.method, EstimationMethod::GlobalMarket);
        assert_relative_eq!(estimate.estimated_amount, 140.0, epsilon = 1e-9);
    }

    #[test]
    fn placeholder_amounts_are_not_sampled() {
        let records = vec![
            BidRecord::new("BLOC", "SURGERY", "TABLE", "NO BIDDER", 9_000.0),
            BidRecord::new("BLOC", "SURGERY", "LAMPE", "ACME", 100.0),
        ];
        let focal = FocalDistributorConfig::new(FOCAL);
        let config = AnalysisConfig::default();
        let estimator = estimator_for(&records, &focal, &config);

        let estimate = estimator.estimate_price("SURGERY", "TABLE");
        assert_eq!(estimate.method, EstimationMethod::CategoryMedian);
        assert_relative_eq!(estimate.estimated_amount, 100.0);
        assert_eq!(estimator.find_unbid_groups()[0].reason, UnbidReason::NoBidder);
    }

    #[test]
    fn empty_growth_summary_is_positive_zero() {
        let focal = FocalDistributorConfig::new(FOCAL);
        let config = AnalysisConfig::default();
        let summary = estimator_for(&[], &focal, &config).growth_summary(&[], &[]);
        assert!(summary.total_estimated_value.is_sign_positive());
        assert!(summary.top_recommendation.is_none());
    }

    #[test]
    fn empty_dataset_still_estimates() {
        let focal = FocalDistributorConfig::new(FOCAL);
        let config = AnalysisConfig::default();
        let estimate = estimator_for(&[], &focal, &config).estimate_price("IMAGING", "SCANNER");
        assert_eq!(estimate.estimated_amount, 0.0);
        assert_eq!(estimate.confidence, Confidence::Low);
    }

    #[test]
    fn scoring_weights_by_confidence() {
        let weights = ConfidenceWeights::default();
        let score = |confidence| score_opportunity(2_000_000.0, confidence, &weights, 1_000_000.0);
        assert_relative_eq!(score(Confidence::High), 2.0);
        assert_relative_eq!(score(Confidence::Medium), 1.4, epsilon = 1e-9);
        assert_relative_eq!(score(Confidence::Low), 0.8, epsilon = 1e-9);
    }

    #[rstest]
    #[case(0.0, Priority::Low)]
    #[case(0.999, Priority::Low)]
    #[case(1.0, Priority::Medium)]
    #[case(2.0, Priority::Medium)]
    #[case(4.999, Priority::Medium)]
    #[case(5.0, Priority::High)]
    #[case(120.0, Priority::High)]
    fn priority_bins_include_lower_edge(#[case] score: f64, #[case] expected: Priority) {
        assert_eq!(prioritize(score, &PriorityCutoffs::default()), expected);
    }

    #[test]
    fn opportunities_are_ranked_and_summarised() {
        let records = vec![
            BidRecord::new("HEMATO", "BIOLOGY", "CBC-5P", FOCAL, 1_000_000.0),
            BidRecord::new("HEMATO", "BIOLOGY", "CBC-3P", "ACME", 2_000_000.0),
            BidRecord::new("HEMATO", "BIOLOGY", "CBC-3P", "BETA", 4_000_000.0),
            BidRecord::new("IRM", "IMAGING", "IRM-1.5T", "ACME", 12_000_000.0),
        ];
        let focal = FocalDistributorConfig::new(FOCAL);
        let config = AnalysisConfig::default();
        let estimator = estimator_for(&records, &focal, &config);
        let ranked = estimator.opportunities();

        assert_eq!(ranked.len(), 2);
        // IRM-1.5T: one similar item → category median 12M, Medium → 8.4
        assert_eq!(ranked[0].group.lot_item, "IRM-1.5T");
        assert_relative_eq!(ranked[0].score, 8.4, epsilon = 1e-9);
        assert_eq!(ranked[0].priority, Priority::High);
        // CBC-3P: three CBC items → median 2M, High → 2.0
        assert_eq!(ranked[1].estimate.confidence, Confidence::High);
        assert_relative_eq!(ranked[1].score, 2.0);
        assert_eq!(ranked[1].priority, Priority::Medium);

        let performance: Vec<GroupPerformance> = Vec::new();
        let summary = estimator.growth_summary(&ranked, &performance);
        assert_eq!(summary.opportunity_count, 2);
        assert_eq!(summary.high_priority_count, 1);
        assert_relative_eq!(summary.total_estimated_value, 14_000_000.0);
        assert_eq!(summary.top_recommendation.unwrap().group.lot_item, "IRM-1.5T");
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let make = |lot: &str| Opportunity {
            group: UnbidGroup {
                product_line: "P".into(),
                category: "C".into(),
                lot_item: lot.into(),
                reason: UnbidReason::FocalAbsent,
            },
            estimate: PriceEstimate {
                estimated_amount: 1.0,
                confidence: Confidence::Low,
                method: EstimationMethod::GlobalMarket,
            },
            score: 1.0,
            priority: Priority::Medium,
        };
        let ranked = rank_opportunities(vec![make("first"), make("second"), make("third")]);
        let lots: Vec<&str> = ranked.iter().map(|o| o.group.lot_item.as_str()).collect();
        assert_eq!(lots, vec!["first", "second", "third"]);
    }

    #[test]
    fn estimation_method_labels() {
        let json = serde_json::to_value(EstimationMethod::SimilarItems).unwrap();
        assert_eq!(json, "Median of similar items");
        let json = serde_json::to_value(EstimationMethod::GlobalMarket).unwrap();
        assert_eq!(json, "Global market estimate");
    }
}
