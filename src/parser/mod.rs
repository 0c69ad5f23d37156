// Parsers turning raw source text into untyped bid tables.

pub mod csv_parser;

pub use csv_parser::{CsvBidParser, Parser, RawRow, RawTable};
