use crate::model::{AnalysisError, BidRecord, Column, Dataset};
use crate::parser::{RawRow, RawTable};
use crate::utils::{normalize_key, parse_amount};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// Columns every source table must carry.
pub const REQUIRED_COLUMNS: [Column; 4] = [
    Column::ProductLine,
    Column::LotItem,
    Column::Distributor,
    Column::SubmittedAmount,
];

pub const UNCLASSIFIED: &str = "UNCLASSIFIED";

/// Distributor cells that spreadsheet exports write for an empty value.
const NULL_MARKERS: [&str; 3] = ["NAN", "NULL", "N/A"];

#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub label: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(label: &str, keywords: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_uppercase()).collect(),
        }
    }
}

/// Ordered keyword rules deriving a category from the lot description.
/// Rules are tried top to bottom and the first keyword hit wins.
#[derive(Debug, Clone)]
pub struct CategoryClassifier {
    rules: Vec<CategoryRule>,
}

impl CategoryClassifier {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    pub fn classify(&self, lot_item: &str) -> String {
        let lot = lot_item.to_uppercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| lot.contains(k.as_str())))
            .map(|rule| rule.label.clone())
            .unwrap_or_else(|| UNCLASSIFIED.to_string())
    }
}

impl Default for CategoryClassifier {
    fn default() -> Self {
        Self::new(vec![
            CategoryRule::new(
                "BIOLOGY",
                &[
                    "BIOLOG", "BIOCHIM", "HEMATO", "IMMUNO", "ANALYSEUR", "REACTIF", "AUTOMATE",
                    "CENTRIFUG", "MICROSCOP", "LABORATOIRE",
                ],
            ),
            CategoryRule::new(
                "SURGERY",
                &[
                    "CHIRURG", "BLOC", "BISTOURI", "SCIALYTIQUE", "TABLE D'OPERATION", "ANESTHES",
                    "COELIO",
                ],
            ),
            CategoryRule::new(
                "IMAGING",
                &[
                    "IMAGERIE", "RADIO", "ECHOGRAPH", "SCANNER", "IRM", "MAMMOGRAPH", "FLUOROSCOP",
                ],
            ),
            CategoryRule::new(
                "OTHER",
                &["MOBILIER", "CONSOMMABLE", "MAINTENANCE", "INFORMATIQUE", "FORMATION"],
            ),
        ])
    }
}

/// Row accounting of one normalization run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizationReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub dropped_no_distributor: usize,
    pub dropped_no_amount: usize,
    pub duplicates_merged: usize,
}

pub struct Normalizer {
    classifier: CategoryClassifier,
}

impl Normalizer {
    pub fn new(classifier: CategoryClassifier) -> Self {
        Self { classifier }
    }

    pub fn normalize(
        &self,
        table: RawTable,
    ) -> Result<(Dataset, NormalizationReport), AnalysisError> {
        self.normalize_all(vec![table])
    }

    /// Merges several uploaded tables into one dataset. A row already present in
    /// an earlier source is kept once; identical rows inside one source are all kept.
    pub fn normalize_all(
        &self,
        tables: Vec<RawTable>,
    ) -> Result<(Dataset, NormalizationReport), AnalysisError> {
        for table in &tables {
            check_required(table)?;
        }

        let mut columns: Vec<Column> = REQUIRED_COLUMNS.to_vec();
        columns.push(Column::Category);
        for table in &tables {
            for column in &table.columns {
                if !columns.contains(column) {
                    columns.push(*column);
                }
            }
        }

        let mut report = NormalizationReport::default();
        let mut earlier_sources: HashSet<String> = HashSet::new();
        let mut records = Vec::new();

        for table in tables {
            let mut this_source = HashSet::new();
            for row in &table.rows {
                report.total_rows += 1;
                let record = match self.normalize_row(row) {
                    Ok(record) => record,
                    Err(RowRejection::NoDistributor) => {
                        report.dropped_no_distributor += 1;
                        continue;
                    }
                    Err(RowRejection::NoAmount) => {
                        report.dropped_no_amount += 1;
                        continue;
                    }
                };
                let key = dedup_key(&record);
                if earlier_sources.contains(&key) {
                    report.duplicates_merged += 1;
                    continue;
                }
                this_source.insert(key);
                records.push(record);
            }
            earlier_sources.extend(this_source);
        }
        report.kept_rows = records.len();

        debug!(
            "Dropped {} rows without distributor, {} without amount",
            report.dropped_no_distributor, report.dropped_no_amount
        );
        info!(
            "Normalized {} of {} rows ({} duplicates merged)",
            report.kept_rows, report.total_rows, report.duplicates_merged
        );

        Ok((Dataset::new(records, columns), report))
    }

    fn normalize_row(&self, row: &RawRow) -> Result<BidRecord, RowRejection> {
        let distributor = normalize_key(row.get(Column::Distributor).unwrap_or_default());
        if distributor.is_empty() || NULL_MARKERS.contains(&distributor.as_str()) {
            return Err(RowRejection::NoDistributor);
        }

        let submitted_amount = parse_amount(row.get(Column::SubmittedAmount).unwrap_or_default());
        if submitted_amount <= 0.0 {
            return Err(RowRejection::NoAmount);
        }

        let lot_item = normalize_key(row.get(Column::LotItem).unwrap_or_default());
        let category = optional_key(row, Column::Category)
            .unwrap_or_else(|| self.classifier.classify(&lot_item));

        Ok(BidRecord {
            reference: optional_key(row, Column::Reference),
            product_line: normalize_key(row.get(Column::ProductLine).unwrap_or_default()),
            category,
            lot_item,
            brand: normalize_key(row.get(Column::Brand).unwrap_or_default()),
            model: normalize_key(row.get(Column::Model).unwrap_or_default()),
            distributor,
            submitted_amount,
            awarded_to: optional_key(row, Column::AwardedTo),
        })
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(CategoryClassifier::default())
    }
}

enum RowRejection {
    NoDistributor,
    NoAmount,
}

fn check_required(table: &RawTable) -> Result<(), AnalysisError> {
    match REQUIRED_COLUMNS.iter().find(|c| !table.columns.contains(c)) {
        Some(missing) => Err(AnalysisError::MissingColumn(*missing)),
        None => Ok(()),
    }
}

fn optional_key(row: &RawRow, column: Column) -> Option<String> {
    row.get(column)
        .map(normalize_key)
        .filter(|v| !v.is_empty() && !NULL_MARKERS.contains(&v.as_str()))
}

fn dedup_key(record: &BidRecord) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}|{}|{}|{}",
        record.reference.as_deref().unwrap_or_default(),
        record.product_line,
        record.category,
        record.lot_item,
        record.brand,
        record.model,
        record.distributor,
        record.submitted_amount.to_bits(),
        record.awarded_to.as_deref().unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{CsvBidParser, Parser};

    fn table(csv: &str) -> RawTable {
        CsvBidParser::new().parse(csv).unwrap()
    }

    #[test]
    fn cleans_identifiers_and_amounts() {
        let raw = table(
            "paillasse,gamme,marque,distributeur,montant soumission\n\
             hémato , analyseur-5p,sysmex, acme medical ,\"1 250 000 FCFA\"\n",
        );
        let (dataset, report) = Normalizer::default().normalize(raw).unwrap();

        assert_eq!(report.kept_rows, 1);
        let record = &dataset.records()[0];
        assert_eq!(record.product_line, "HÉMATO");
        assert_eq!(record.lot_item, "ANALYSEUR-5P");
        assert_eq!(record.distributor, "ACME MEDICAL");
        assert_eq!(record.category, "BIOLOGY");
        assert_eq!(record.submitted_amount, 1_250_000.0);
        assert_eq!(record.reference, None);
        assert!(!dataset.has_column(Column::Reference));
    }

    #[test]
    fn drops_rows_without_distributor_or_amount() {
        let raw = table(
            "paillasse,gamme,distributeur,montant soumission\n\
             A,X,nan,100\n\
             A,X,,100\n\
             A,X,ACME,0\n\
             A,X,ACME,n/a\n\
             A,X,ACME,50\n",
        );
        let (dataset, report) = Normalizer::default().normalize(raw).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(report.dropped_no_distributor, 2);
        assert_eq!(report.dropped_no_amount, 2);
    }

    #[test]
    fn supplied_category_wins_over_classifier() {
        let raw = table(
            "paillasse,categorie,gamme,distributeur,montant\n\
             A,labo,SCANNER 64,ACME,10\n",
        );
        let (dataset, _) = Normalizer::default().normalize(raw).unwrap();
        assert_eq!(dataset.records()[0].category, "LABO");
    }

    #[test]
    fn missing_required_column_fails_fast() {
        let raw = table("paillasse,gamme,montant\nA,X,10\n");
        assert_eq!(
            Normalizer::default().normalize(raw).unwrap_err(),
            AnalysisError::MissingColumn(Column::Distributor)
        );
    }

    #[test]
    fn merges_duplicate_sources() {
        let csv = "paillasse,gamme,distributeur,montant\nA,X,ACME,10\nA,Y,BETA,20\n";
        let second = "paillasse,gamme,distributeur,montant\nA,X,ACME,10\nA,Z,BETA,30\n";
        let (dataset, report) = Normalizer::default()
            .normalize_all(vec![table(csv), table(second)])
            .unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(report.duplicates_merged, 1);
        assert_eq!(report.total_rows, 4);
    }

    #[test]
    fn identical_rows_within_one_source_are_all_kept() {
        let csv = "paillasse,gamme,distributeur,montant\n\
                   HEMATO,CBC,ACME,100\n\
                   HEMATO,CBC,ACME,100\n";
        let (dataset, report) = Normalizer::default().normalize(table(csv)).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(report.duplicates_merged, 0);
        let total: f64 = dataset.records().iter().map(|r| r.submitted_amount).sum();
        assert_eq!(total, 200.0);
    }

    #[test]
    fn repeated_source_rows_merge_once_each() {
        let first = "paillasse,gamme,distributeur,montant\nA,X,ACME,10\nA,X,ACME,10\n";
        let second = "paillasse,gamme,distributeur,montant\nA,X,ACME,10\nA,X,ACME,10\n";
        let (dataset, report) = Normalizer::default()
            .normalize_all(vec![table(first), table(second)])
            .unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(report.duplicates_merged, 2);
    }

    #[test]
    fn classifier_rules_are_ordered() {
        let classifier = CategoryClassifier::default();
        // "BLOC" (surgery) and "RADIO" (imaging) both match; surgery is listed first.
        assert_eq!(classifier.classify("RADIO DE BLOC"), "SURGERY");
        assert_eq!(classifier.classify("ECHOGRAPHE PORTABLE"), "IMAGING");
        assert_eq!(classifier.classify("mobilier de salle"), "OTHER");
        assert_eq!(classifier.classify("GROUPE ELECTROGENE"), UNCLASSIFIED);
    }
}
