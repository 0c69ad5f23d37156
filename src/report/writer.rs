use crate::analyzer::AnalysisReport;
use crate::model::{BidRecord, ReportError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub fn write_json<W: Write>(report: &AnalysisReport, out: W) -> Result<(), ReportError> {
    serde_json::to_writer_pretty(out, report)?;
    Ok(())
}

/// Writes the normalized records as CSV, one row per bid.
pub fn export_records_csv<W: Write>(records: &[BidRecord], out: W) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_writer(out);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes per-dataset outputs under one directory.
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes `<name>.json` and `<name>-records.csv`, returning their paths.
    pub fn write(
        &self,
        name: &str,
        report: &AnalysisReport,
        records: &[BidRecord],
    ) -> Result<(PathBuf, PathBuf), ReportError> {
        fs::create_dir_all(&self.output_dir)?;
        let stem = file_stem(name);

        let json_path = self.output_dir.join(format!("{stem}.json"));
        write_json(report, fs::File::create(&json_path)?)?;

        let csv_path = self.output_dir.join(format!("{stem}-records.csv"));
        export_records_csv(records, fs::File::create(&csv_path)?)?;

        info!("Saved report: {}", json_path.display());
        Ok((json_path, csv_path))
    }
}

/// Lowercase, dash-separated file name for a dataset label.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let stem = stem.trim_matches('-').to_string();
    if stem.is_empty() { "report".to_string() } else { stem }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::BidAnalyzer;
    use crate::config::{AnalysisConfig, FocalDistributorConfig};
    use crate::model::Dataset;

    fn report_and_records() -> (AnalysisReport, Vec<BidRecord>) {
        let records = vec![
            BidRecord::new("HEMATO", "BIOLOGY", "CBC", "FOCAL", 10.0).with_reference("AO-1"),
            BidRecord::new("HEMATO", "BIOLOGY", "CBC", "ACME", 30.0).with_reference("AO-1"),
        ];
        let analyzer =
            BidAnalyzer::new(FocalDistributorConfig::new("FOCAL"), AnalysisConfig::default());
        let report = analyzer.analyze(&Dataset::from_records(records.clone())).unwrap();
        (report, records)
    }

    #[test]
    fn file_stem_is_filesystem_safe() {
        assert_eq!(file_stem("Appel d'offres 2024/Q1"), "appel-d-offres-2024-q1");
        assert_eq!(file_stem("  "), "report");
    }

    #[test]
    fn csv_export_has_header_and_rows() {
        let (_, records) = report_and_records();
        let mut buffer = Vec::new();
        export_records_csv(&records, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("reference,product_line,category,lot_item,brand,model,distributor,submitted_amount,awarded_to")
        );
        assert_eq!(lines.next(), Some("AO-1,HEMATO,BIOLOGY,CBC,,,FOCAL,10.0,"));
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn writes_both_files() {
        let (report, records) = report_and_records();
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let (json_path, csv_path) = writer.write("Tender 2024", &report, &records).unwrap();

        assert!(json_path.ends_with("tender-2024.json"));
        assert!(csv_path.ends_with("tender-2024-records.csv"));
        let content = fs::read_to_string(json_path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["focal_distributor"], "FOCAL");
        assert_eq!(json["market_share"]["share_pct"], 25.0);
        assert_eq!(json["overall_position"], "StrongCompetitor");
    }
}
