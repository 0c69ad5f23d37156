// CSV export of the bid spreadsheet → RawTable
use crate::model::{Column, ParserError};
use csv::{ReaderBuilder, Trim};
use std::collections::HashMap;

/// Header spellings accepted for each column, compared after `normalize_header`.
const COLUMN_ALIASES: [(Column, &[&str]); 9] = [
    (Column::Reference, &["reference", "ref", "reference ao", "tender"]),
    (Column::ProductLine, &["paillasse", "product line"]),
    (Column::Category, &["categorie", "category"]),
    (Column::LotItem, &["gamme", "lot", "lot item"]),
    (Column::Brand, &["marque", "brand"]),
    (Column::Model, &["modele", "model"]),
    (Column::Distributor, &["distributeur", "distributor", "soumissionnaire"]),
    (
        Column::SubmittedAmount,
        &["montant soumission", "montant", "amount", "submitted amount"],
    ),
    (Column::AwardedTo, &["attributaire", "adjudicataire", "awarded to"]),
];

pub trait Parser {
    fn parse(&self, input: &str) -> Result<RawTable, ParserError>;
}

/// One source row keyed by recognised column. Cells are trimmed, otherwise raw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow(pub HashMap<Column, String>);

impl RawRow {
    pub fn get(&self, column: Column) -> Option<&str> {
        self.0.get(&column).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub columns: Vec<Column>,
    pub rows: Vec<RawRow>,
}

pub struct CsvBidParser;

impl CsvBidParser {
    pub fn new() -> Self {
        Self
    }

    /// French spreadsheet exports use `;`, everything else `,`.
    fn detect_delimiter(input: &str) -> u8 {
        let header = input.lines().next().unwrap_or_default();
        if header.matches(';').count() > header.matches(',').count() {
            b';'
        } else {
            b','
        }
    }
}

impl Default for CsvBidParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for CsvBidParser {
    fn parse(&self, input: &str) -> Result<RawTable, ParserError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(Self::detect_delimiter(input))
            .flexible(true)
            .trim(Trim::All)
            .from_reader(input.as_bytes());

        let headers = reader.headers()?.clone();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ParserError::MissingHeader);
        }

        // Positions of recognised headers; the first occurrence of a column wins.
        let mut mapping: Vec<(usize, Column)> = Vec::new();
        for (index, header) in headers.iter().enumerate() {
            if let Some(column) = resolve_column(header) {
                if !mapping.iter().any(|(_, c)| *c == column) {
                    mapping.push((index, column));
                }
            }
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row = RawRow::default();
            for (index, column) in &mapping {
                if let Some(cell) = record.get(*index) {
                    row.0.insert(*column, cell.to_string());
                }
            }
            rows.push(row);
        }

        Ok(RawTable {
            columns: mapping.into_iter().map(|(_, c)| c).collect(),
            rows,
        })
    }
}

/// Lowercases, strips French accents, and folds `_` and repeated spaces.
fn normalize_header(header: &str) -> String {
    let folded: String = header
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'à' | 'â' => 'a',
            'ô' => 'o',
            'î' | 'ï' => 'i',
            'û' | 'ù' => 'u',
            'ç' => 'c',
            '_' => ' ',
            other => other,
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn resolve_column(header: &str) -> Option<Column> {
    let normalized = normalize_header(header);
    COLUMN_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&normalized.as_str()))
        .map(|(column, _)| *column)
}
