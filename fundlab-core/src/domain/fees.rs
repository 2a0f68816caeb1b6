use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Static fee attributes for one instrument, as of a given date.
///
/// Fee values are annual percentages as published (e.g., 1.5 = 1.5%/yr).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeRecord {
    pub instrument_id: String,
    pub management_fee: f64,
    pub custodian_fee: f64,
    pub guarantee_fee: f64,
    pub other_fee: f64,
    pub total_expense_ratio: f64,
    /// Publication date of this record. When an instrument has several
    /// historical revisions, the latest one wins.
    pub as_of: NaiveDate,
}

/// Reduce a fee record set to one record per instrument: last-is-latest.
///
/// For each instrument id, keeps the record with the greatest `as_of` date.
/// Between two records with the same `as_of`, the later one in input order
/// wins, so the reduction stays deterministic for a given input sequence.
pub fn latest_fees(records: &[FeeRecord]) -> HashMap<String, FeeRecord> {
    let mut latest: HashMap<String, FeeRecord> = HashMap::new();
    for record in records {
        match latest.get(&record.instrument_id) {
            Some(existing) if existing.as_of > record.as_of => {}
            _ => {
                latest.insert(record.instrument_id.clone(), record.clone());
            }
        }
    }
    latest
}
