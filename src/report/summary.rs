use crate::analyzer::AnalysisReport;
use std::fmt::Write;
use tracing::info;

/// Human-readable digest of a report, one KPI per line.
pub fn format_summary(dataset: &str, report: &AnalysisReport) -> String {
    let share = &report.market_share;
    let mut msg = String::new();
    let _ = writeln!(msg, "📊 {} | {}", dataset, report.focal_distributor);
    let _ = writeln!(
        msg,
        "💰 Market: {:.0} | Focal: {:.0} ({:.1}%)",
        share.total_market, share.total_focal, share.share_pct
    );
    let _ = writeln!(
        msg,
        "🏁 Rank: #{} by amount, #{} by count | {:?}",
        report.rank_by_amount, report.rank_by_count, report.overall_position
    );
    let _ = writeln!(
        msg,
        "📝 Submissions: {}/{} ({:.1}% participation, {:.1}% won)",
        share.focal_count, share.total_count, share.participation_pct, share.win_rate_pct
    );
    if let Some(leader) = report.competitors.first() {
        let _ = writeln!(
            msg,
            "⚔️ Top competitor: {} ({:.1}%)",
            leader.distributor, leader.share_pct
        );
    }
    let _ = writeln!(
        msg,
        "✅ Strong: {} | 📈 Weak: {}",
        report.strong_groups.len(),
        report.weak_groups.len()
    );
    let growth = &report.growth;
    let _ = write!(
        msg,
        "🎯 Opportunities: {} worth {:.0} ({} high priority)",
        growth.opportunity_count, growth.total_estimated_value, growth.high_priority_count
    );
    if let Some(top) = &growth.top_recommendation {
        let _ = write!(
            msg,
            "\n⭐ Next: {} / {} (score {:.2}, {:?})",
            top.group.product_line, top.group.lot_item, top.score, top.priority
        );
    }
    msg
}

pub fn log_summary(dataset: &str, report: &AnalysisReport) {
    for line in format_summary(dataset, report).lines() {
        info!("{}", line);
    }
}
