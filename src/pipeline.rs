// Load → normalize → analyze → report for one configured dataset.
use crate::analyzer::{AnalysisReport, BidAnalyzer};
use crate::config::DatasetConfig;
use crate::model::{Dataset, PipelineError, SourceError};
use crate::normalizer::{NormalizationReport, Normalizer};
use crate::parser::{CsvBidParser, Parser};
use crate::report::{ReportWriter, log_summary};
use crate::source::{DatasetSource, FileSource};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Modification times of every source of a dataset, in configuration order.
pub type SourceStamps = Vec<Option<DateTime<Utc>>>;

pub struct Pipeline {
    parser: CsvBidParser,
    normalizer: Normalizer,
    writer: ReportWriter,
}

impl Pipeline {
    pub fn new(normalizer: Normalizer, writer: ReportWriter) -> Self {
        Self {
            parser: CsvBidParser::new(),
            normalizer,
            writer,
        }
    }

    pub async fn source_stamps(&self, cfg: &DatasetConfig) -> Result<SourceStamps, SourceError> {
        let mut stamps = Vec::with_capacity(cfg.sources.len());
        for path in &cfg.sources {
            stamps.push(FileSource::new(path).modified().await?);
        }
        Ok(stamps)
    }

    /// Reads and merges every source of the dataset.
    pub async fn load(
        &self,
        cfg: &DatasetConfig,
    ) -> Result<(Dataset, NormalizationReport), PipelineError> {
        let mut tables = Vec::with_capacity(cfg.sources.len());
        for path in &cfg.sources {
            let file = FileSource::new(path).fetch().await?;
            let table = self.parser.parse(&file.content)?;
            debug!("Parsed {} rows from {}", table.rows.len(), file.path.display());
            tables.push(table);
        }
        Ok(self.normalizer.normalize_all(tables)?)
    }

    pub async fn run(&self, cfg: &DatasetConfig) -> Result<AnalysisReport, PipelineError> {
        info!("Processing dataset: {}", cfg.name);
        let (dataset, _) = self.load(cfg).await?;

        let analyzer = BidAnalyzer::new(cfg.focal.clone(), cfg.analysis.clone());
        let report = analyzer.analyze(&dataset)?;
        log_summary(&cfg.name, &report);

        self.writer.write(&cfg.name, &report, dataset.records())?;
        info!("Finished processing dataset: {}", cfg.name);
        Ok(report)
    }
}
