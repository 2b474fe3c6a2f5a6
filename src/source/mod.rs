//! Record sources feeding the bulk loader.

use crate::error::{LoaderError, Result};
use crate::schema::{BulkDocument, ProductRecord, QueryRecord};
use chrono::{DateTime, TimeDelta, Utc};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::path::Path;

/// An ordered stream of records whose size is known before the first one is read
pub trait RecordSource: Iterator<Item = Result<Self::Record>> {
    type Record: BulkDocument;

    /// Number of records the source will yield
    fn total(&self) -> usize;
}

fn catalog_reader(path: &Path) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|e| LoaderError::io(path, e))?;
    Ok(ReaderBuilder::new()
        .delimiter(b',')
        .quote(b'"')
        .flexible(true)
        .from_reader(file))
}

/// Products read from the cleaned catalog, ids assigned by row position
pub struct CatalogSource {
    headers: StringRecord,
    records: StringRecordsIntoIter<File>,
    total: usize,
    next_id: u64,
}

impl CatalogSource {
    /// Open the cleaned catalog. The file is scanned once up front to count its data rows.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut total = 0;
        let mut record = StringRecord::new();
        let mut counter = catalog_reader(path)?;
        while counter.read_record(&mut record)? {
            total += 1;
        }

        let mut reader = catalog_reader(path)?;
        let headers = reader.headers()?.clone();
        tracing::info!("Catalog {} has {} records", path.display(), total);

        Ok(Self {
            headers,
            records: reader.into_records(),
            total,
            next_id: 0,
        })
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }
}

impl Iterator for CatalogSource {
    type Item = Result<ProductRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };
        let id = self.next_id;
        self.next_id += 1;

        Some(ProductRecord::from_record(id, &self.headers, &record))
    }
}

impl RecordSource for CatalogSource {
    type Record = ProductRecord;

    fn total(&self) -> usize {
        self.total
    }
}

const SURNAMES: &[&str] = &[
    "Garcia", "Rodriguez", "Gonzalez", "Fernandez", "Lopez", "Martinez", "Sanchez", "Perez",
    "Gomez", "Martin", "Jimenez", "Ruiz", "Hernandez", "Diaz", "Moreno", "Alvarez", "Romero",
    "Alonso", "Gutierrez", "Navarro", "Torres", "Dominguez", "Vazquez", "Ramos", "Gil",
    "Ramirez", "Serrano", "Blanco", "Molina", "Morales", "Suarez", "Ortega", "Delgado",
    "Castro", "Ortiz", "Rubio", "Marin", "Sanz", "Nunez", "Iglesias", "Medina", "Garrido",
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Miller", "Davis", "Wilson",
];

/// Deterministic fake search-log entries, one per second going back from `now`
pub struct SyntheticQuerySource {
    rng: StdRng,
    now: DateTime<Utc>,
    count: usize,
    next: usize,
}

impl SyntheticQuerySource {
    pub fn new(count: usize, seed: u64, now: DateTime<Utc>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            now,
            count,
            next: 0,
        }
    }
}

impl Iterator for SyntheticQuerySource {
    type Item = Result<QueryRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let i = self.next;
        self.next += 1;

        let timestamp = (self.now - TimeDelta::seconds(i as i64)).timestamp_millis();
        let terms = SURNAMES[self.rng.gen_range(0..SURNAMES.len())].to_string();

        Some(Ok(QueryRecord {
            id: i as u64,
            timestamp,
            terms,
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl RecordSource for SyntheticQuerySource {
    type Record = QueryRecord;

    fn total(&self) -> usize {
        self.count
    }
}
