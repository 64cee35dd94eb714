//! Exact-match in-memory lookup table.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

use super::address::is_valid_address;
use super::{LocationRecord, LookupService};
use crate::error::{LoadError, LookupError};

/// Number of fields in every dataset record: address, city, country.
const RECORD_FIELDS: usize = 3;

/// Lookup backend over a table loaded once from a CSV dataset.
///
/// Keys are matched exactly as written in the dataset. No canonicalization
/// is done, so `10.0.0.1` and `010.000.000.001` are different keys, as are
/// compressed and expanded forms of the same IPv6 address.
#[derive(Debug, Clone, Default)]
pub struct TableLookupService {
    table: HashMap<String, LocationRecord>,
}

impl TableLookupService {
    /// Build the table from a dataset file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading lookup dataset");

        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Build the table from `address,city,country` records.
    ///
    /// There is no header row. A record with any other number of fields
    /// fails the whole load. When an address repeats, the later record wins.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut table = HashMap::new();
        let mut overwritten = 0usize;

        for result in csv_reader.records() {
            let record = result?;
            if record.len() != RECORD_FIELDS {
                return Err(LoadError::MalformedRecord {
                    line: record.position().map(|p| p.line()).unwrap_or_default(),
                    fields: record.len(),
                });
            }

            let location = LocationRecord {
                country: record[2].to_string(),
                city: record[1].to_string(),
            };
            if table.insert(record[0].to_string(), location).is_some() {
                debug!(address = &record[0], "Duplicate address, keeping later record");
                overwritten += 1;
            }
        }

        info!(records = table.len(), overwritten, "Lookup table ready");
        Ok(Self { table })
    }

    /// Number of distinct addresses in the table.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl LookupService for TableLookupService {
    fn resolve(&self, address: &str) -> Result<LocationRecord, LookupError> {
        if !is_valid_address(address) {
            return Err(LookupError::InvalidAddress);
        }

        self.table
            .get(address)
            .cloned()
            .ok_or(LookupError::NotFound)
    }

    fn record_count(&self) -> usize {
        self.len()
    }
}
