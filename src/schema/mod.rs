use crate::error::{LoaderError, Result};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Anything the bulk builder can ship: a serializable body plus its position id
pub trait BulkDocument: Serialize {
    fn doc_id(&self) -> u64;
}

/// Attribute columns of the cleaned catalog, in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ProductField {
    Description,
    Origin,
    Section,
    Family,
    Brand,
    Variety,
    Format,
    Group,
    InternetDescription,
    Manufacturer,
}

/// One catalog product as indexed on the search service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: u64,
    pub description: Option<String>,
    pub origin: Option<String>,
    pub section: Option<String>,
    pub family: Option<String>,
    pub brand: Option<String>,
    pub variety: Option<String>,
    pub format: Option<String>,
    pub group: Option<String>,
    pub internet_description: Option<String>,
    pub manufacturer: Option<String>,
}

impl ProductRecord {
    /// Build a record from a column-name -> value view of one source row.
    ///
    /// Every attribute must exist as a column; a column whose cell is absent
    /// (short row) maps to `None`. Unknown columns, including any `id`
    /// column, are ignored: the id is always the row position.
    pub fn from_row(id: u64, row: &HashMap<&str, Option<&str>>) -> Result<Self> {
        let mut record = ProductRecord {
            id,
            ..Default::default()
        };

        for field in ProductField::iter() {
            let cell = *row
                .get(field.as_ref())
                .ok_or_else(|| LoaderError::MissingField {
                    id,
                    field: field.to_string(),
                })?;
            *record.slot(field) = cell.map(str::to_string);
        }

        Ok(record)
    }

    /// Build a record from a CSV row and the header naming its columns
    pub fn from_record(id: u64, headers: &StringRecord, record: &StringRecord) -> Result<Self> {
        let row: HashMap<&str, Option<&str>> = headers
            .iter()
            .enumerate()
            .map(|(i, column)| (column, record.get(i)))
            .collect();

        Self::from_row(id, &row)
    }

    fn slot(&mut self, field: ProductField) -> &mut Option<String> {
        match field {
            ProductField::Description => &mut self.description,
            ProductField::Origin => &mut self.origin,
            ProductField::Section => &mut self.section,
            ProductField::Family => &mut self.family,
            ProductField::Brand => &mut self.brand,
            ProductField::Variety => &mut self.variety,
            ProductField::Format => &mut self.format,
            ProductField::Group => &mut self.group,
            ProductField::InternetDescription => &mut self.internet_description,
            ProductField::Manufacturer => &mut self.manufacturer,
        }
    }
}

impl BulkDocument for ProductRecord {
    fn doc_id(&self) -> u64 {
        self.id
    }
}

/// One synthetic search-log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub id: u64,
    /// Epoch milliseconds
    pub timestamp: i64,
    pub terms: String,
}

impl BulkDocument for QueryRecord {
    fn doc_id(&self) -> u64 {
        self.id
    }
}

/// Settings and mappings document sent when a collection is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexSchema(serde_json::Value);

impl IndexSchema {
    pub fn new(body: serde_json::Value) -> Self {
        Self(body)
    }

    /// Load the schema document from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| LoaderError::io(path, e))?;
        let body: serde_json::Value = serde_json::from_str(&raw)?;
        if !body.is_object() {
            return Err(LoaderError::ConfigError(format!(
                "Schema '{}' must be a JSON object",
                path.display()
            )));
        }
        tracing::debug!("Loaded index schema from {}", path.display());
        Ok(Self(body))
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use std::str::FromStr;

    const COLUMNS: [&str; 10] = [
        "description",
        "origin",
        "section",
        "family",
        "brand",
        "variety",
        "format",
        "group",
        "internet_description",
        "manufacturer",
    ];

    fn full_row() -> HashMap<&'static str, Option<&'static str>> {
        COLUMNS.iter().map(|c| (*c, Some("x"))).collect()
    }

    #[test]
    fn test_field_names_match_columns() {
        let names: Vec<String> = ProductField::iter().map(|f| f.to_string()).collect();
        assert_eq!(names, COLUMNS);
        for field in ProductField::iter() {
            assert_eq!(ProductField::from_str(field.as_ref()).unwrap(), field);
        }
    }

    #[test]
    fn test_from_row_maps_every_attribute() {
        let mut row = full_row();
        row.insert("description", Some("Milk 1L"));
        row.insert("internet_description", Some("Fresh whole milk"));
        row.insert("id", Some("999"));

        let record = ProductRecord::from_row(7, &row).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.description.as_deref(), Some("Milk 1L"));
        assert_eq!(record.internet_description.as_deref(), Some("Fresh whole milk"));
        assert_eq!(record.manufacturer.as_deref(), Some("x"));
    }

    #[test]
    fn test_short_row_yields_none() {
        let mut row = full_row();
        row.insert("manufacturer", None);

        let record = ProductRecord::from_row(0, &row).unwrap();
        assert_eq!(record.manufacturer, None);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let mut row = full_row();
        row.remove("brand");

        let err = ProductRecord::from_row(3, &row).unwrap_err();
        match err {
            LoaderError::MissingField { id, field } => {
                assert_eq!(id, 3);
                assert_eq!(field, "brand");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_record_uses_header_names() {
        let mut headers: Vec<&str> = COLUMNS.iter().rev().copied().collect();
        headers.push("id");
        let headers = StringRecord::from(headers);
        let record = StringRecord::from(vec![
            "Pascual SA", "Whole milk", "Fresh", "1L", "Whole", "Pascual", "Milk", "Dairy",
            "Spain", "Milk 1L", "999",
        ]);

        let product = ProductRecord::from_record(4, &headers, &record).unwrap();
        assert_eq!(product.id, 4);
        assert_eq!(product.description.as_deref(), Some("Milk 1L"));
        assert_eq!(product.manufacturer.as_deref(), Some("Pascual SA"));
        assert_eq!(product.internet_description.as_deref(), Some("Whole milk"));
    }

    #[test]
    fn test_from_record_short_row_and_missing_column() {
        let headers = StringRecord::from(COLUMNS.to_vec());
        let record = StringRecord::from(vec!["Milk 1L", "Spain"]);
        let product = ProductRecord::from_record(0, &headers, &record).unwrap();
        assert_eq!(product.origin.as_deref(), Some("Spain"));
        assert_eq!(product.section, None);

        let headers = StringRecord::from(vec!["description", "origin"]);
        assert!(matches!(
            ProductRecord::from_record(5, &headers, &record),
            Err(LoaderError::MissingField { id: 5, .. })
        ));
    }

    #[test]
    fn test_product_serializes_flat_with_nulls() {
        let record = ProductRecord {
            id: 1,
            description: Some("Milk 1L".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["description"], "Milk 1L");
        assert_eq!(value["origin"], serde_json::Value::Null);
        assert_eq!(value.as_object().unwrap().len(), 11);
    }

    #[test]
    fn test_index_schema_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"mappings": {{"properties": {{"description": {{"type": "text"}}}}}}}}"#)
            .unwrap();

        let schema = IndexSchema::from_file(file.path()).unwrap();
        assert_eq!(
            schema.as_json()["mappings"]["properties"]["description"]["type"],
            json!("text")
        );
    }

    #[test]
    fn test_index_schema_rejects_non_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2]").unwrap();
        assert!(matches!(
            IndexSchema::from_file(file.path()),
            Err(LoaderError::ConfigError(_))
        ));
    }
}
