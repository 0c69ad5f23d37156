#![allow(dead_code)]

use bid_sniper::model::BidRecord;

pub const FOCAL: &str = "TECHNOLOGIES SERVICES";

pub fn bid(
    product_line: &str,
    category: &str,
    lot: &str,
    distributor: &str,
    amount: f64,
) -> BidRecord {
    BidRecord::new(product_line, category, lot, distributor, amount)
}

/// One row per distributor, all in the same lot.
pub fn distributors(amounts: &[(&str, f64)]) -> Vec<BidRecord> {
    amounts
        .iter()
        .map(|(name, amount)| bid("HEMATO", "BIOLOGY", "CBC", name, *amount))
        .collect()
}

/// A small but realistic tender: three product lines, five bidders, one placeholder lot.
pub fn tender() -> Vec<BidRecord> {
    let rows = [
        ("AO-2024-01", "HEMATOLOGIE", "BIOLOGY", "ANALYSEUR-5P", FOCAL, 18_000_000.0),
        ("AO-2024-01", "HEMATOLOGIE", "BIOLOGY", "ANALYSEUR-5P", "MEDILAB", 21_000_000.0),
        ("AO-2024-01", "HEMATOLOGIE", "BIOLOGY", "ANALYSEUR-3P", "MEDILAB", 9_000_000.0),
        ("AO-2024-01", "HEMATOLOGIE", "BIOLOGY", "CENTRIFUGEUSE", "BIOSOFT", 2_500_000.0),
        ("AO-2024-02", "IMAGERIE", "IMAGING", "ECHOGRAPHE-PORTABLE", "RADIANCE", 35_000_000.0),
        ("AO-2024-02", "IMAGERIE", "IMAGING", "ECHOGRAPHE-CARDIO", FOCAL, 30_000_000.0),
        ("AO-2024-02", "IMAGERIE", "IMAGING", "MAMMOGRAPHE", "RADIANCE", 60_000_000.0),
        ("AO-2024-03", "BLOC", "SURGERY", "SCIALYTIQUE", "CHIRMED", 12_000_000.0),
        ("AO-2024-03", "BLOC", "SURGERY", "TABLE-OPERATION", "NO BIDDER", 8_000_000.0),
    ];
    rows.into_iter()
        .map(|(reference, product_line, category, lot, distributor, amount)| {
            let record = bid(product_line, category, lot, distributor, amount)
                .with_reference(reference);
            if lot == "ECHOGRAPHE-CARDIO" {
                record.with_awarded_to(FOCAL)
            } else {
                record
            }
        })
        .collect()
}
