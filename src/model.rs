// Core structs: BidRecord, Dataset, grouping dimensions and error types
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One normalized bid line: a distributor's submission for one lot of a tender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidRecord {
    pub reference: Option<String>,
    pub product_line: String,
    pub category: String,
    pub lot_item: String,
    pub brand: String,
    pub model: String,
    pub distributor: String,
    pub submitted_amount: f64,
    pub awarded_to: Option<String>,
}

impl BidRecord {
    pub fn new(
        product_line: impl Into<String>,
        category: impl Into<String>,
        lot_item: impl Into<String>,
        distributor: impl Into<String>,
        submitted_amount: f64,
    ) -> Self {
        Self {
            reference: None,
            product_line: product_line.into(),
            category: category.into(),
            lot_item: lot_item.into(),
            brand: String::new(),
            model: String::new(),
            distributor: distributor.into(),
            submitted_amount,
            awarded_to: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_awarded_to(mut self, winner: impl Into<String>) -> Self {
        self.awarded_to = Some(winner.into());
        self
    }

    /// Identity of the lot this bid targets. A missing reference means a single-tender dataset.
    pub fn lot_key(&self) -> (&str, &str) {
        (self.reference.as_deref().unwrap_or(""), &self.lot_item)
    }
}

/// Columns of the normalized dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Reference,
    ProductLine,
    Category,
    LotItem,
    Brand,
    Model,
    Distributor,
    SubmittedAmount,
    AwardedTo,
}

impl Column {
    pub const ALL: [Column; 9] = [
        Column::Reference,
        Column::ProductLine,
        Column::Category,
        Column::LotItem,
        Column::Brand,
        Column::Model,
        Column::Distributor,
        Column::SubmittedAmount,
        Column::AwardedTo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Reference => "reference",
            Column::ProductLine => "product_line",
            Column::Category => "category",
            Column::LotItem => "lot_item",
            Column::Brand => "brand",
            Column::Model => "model",
            Column::Distributor => "distributor",
            Column::SubmittedAmount => "submitted_amount",
            Column::AwardedTo => "awarded_to",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grouping dimensions shared by every aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupDimension {
    ProductLine,
    Category,
    LotItem,
}

impl GroupDimension {
    pub fn key<'a>(&self, record: &'a BidRecord) -> &'a str {
        match self {
            GroupDimension::ProductLine => &record.product_line,
            GroupDimension::Category => &record.category,
            GroupDimension::LotItem => &record.lot_item,
        }
    }

    pub fn column(&self) -> Column {
        match self {
            GroupDimension::ProductLine => Column::ProductLine,
            GroupDimension::Category => Column::Category,
            GroupDimension::LotItem => Column::LotItem,
        }
    }
}

/// Immutable snapshot of normalized bid records plus the columns the source provided.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<BidRecord>,
    columns: Vec<Column>,
}

impl Dataset {
    pub fn new(records: Vec<BidRecord>, columns: Vec<Column>) -> Self {
        Self { records, columns }
    }

    /// Dataset built in code, where every column is structurally present.
    pub fn from_records(records: Vec<BidRecord>) -> Self {
        Self::new(records, Column::ALL.to_vec())
    }

    pub fn records(&self) -> &[BidRecord] {
        &self.records
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// Fails on the first required column the dataset lacks.
    pub fn require(&self, columns: &[Column]) -> Result<(), AnalysisError> {
        match columns.iter().find(|c| !self.has_column(**c)) {
            Some(missing) => Err(AnalysisError::MissingColumn(*missing)),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("missing required column: {0}")]
    MissingColumn(Column),
    #[error("no usable rows left after filtering")]
    EmptyDataset,
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("CSV decode error: {0}")]
    Csv(#[from] csv::Error),
    #[error("input has no header row")]
    MissingHeader,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported source format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV encode error: {0}")]
    Csv(#[from] csv::Error),
}

/// Any failure of the load → analyze → report pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Report(#[from] ReportError),
}
