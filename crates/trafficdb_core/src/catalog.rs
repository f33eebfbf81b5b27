//! Schema catalog.
//!
//! Primary keys and insert column orders are static. Column lists are always
//! discovered from the connected database.

use indexmap::IndexMap;
use tracing::trace;

use crate::errors::{EngineError, Result};
use crate::executor::{SqlExecutor, Statement};
use crate::ident::Ident;
use crate::scalar::ScalarValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    name: Ident,
    /// Primary key columns in declaration order. Key values supplied by
    /// callers are matched against these positionally.
    primary_key: Vec<Ident>,
    /// Columns supplied on insert, in the order the table declares them.
    /// Auto generated keys are left out.
    insert_columns: Vec<Ident>,
}

impl TableDescriptor {
    pub fn new(name: &str, primary_key: &[&str], insert_columns: &[&str]) -> Self {
        TableDescriptor {
            name: Ident::from_catalog(name),
            primary_key: primary_key.iter().map(|c| Ident::from_catalog(*c)).collect(),
            insert_columns: insert_columns
                .iter()
                .map(|c| Ident::from_catalog(*c))
                .collect(),
        }
    }

    pub fn name(&self) -> &Ident {
        &self.name
    }

    pub fn primary_key(&self) -> &[Ident] {
        &self.primary_key
    }

    pub fn insert_columns(&self) -> &[Ident] {
        &self.insert_columns
    }

    pub fn has_composite_key(&self) -> bool {
        self.primary_key.len() > 1
    }

    fn check(&self) -> Result<()> {
        if self.primary_key.is_empty() {
            return Err(EngineError::InvalidCatalog(format!(
                "table '{}' has no primary key",
                self.name
            )));
        }
        if self.insert_columns.is_empty() {
            return Err(EngineError::InvalidCatalog(format!(
                "table '{}' has no insert columns",
                self.name
            )));
        }

        let idents = std::iter::once(&self.name)
            .chain(&self.primary_key)
            .chain(&self.insert_columns);
        for ident in idents {
            if !Ident::is_plain(ident.as_str()) {
                return Err(EngineError::InvalidCatalog(format!(
                    "'{ident}' is not a valid identifier"
                )));
            }
        }

        Ok(())
    }
}

/// Ordered column names of a table, as reported by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSet {
    table: Ident,
    columns: Vec<Ident>,
}

impl ColumnSet {
    pub(crate) fn from_metadata<S: Into<String>>(
        table: Ident,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        ColumnSet {
            table,
            columns: columns.into_iter().map(Ident::from_catalog).collect(),
        }
    }

    pub fn table(&self) -> &Ident {
        &self.table
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ident> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.as_str().to_string()).collect()
    }
}

/// Registry of every table the engine may operate on.
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: IndexMap<String, TableDescriptor>,
}

impl Catalog {
    pub fn new(descriptors: impl IntoIterator<Item = TableDescriptor>) -> Result<Self> {
        let mut tables = IndexMap::new();
        for desc in descriptors {
            desc.check()?;
            let name = desc.name.as_str().to_string();
            if tables.insert(name.clone(), desc).is_some() {
                return Err(EngineError::InvalidCatalog(format!(
                    "duplicate table '{name}'"
                )));
            }
        }
        Ok(Catalog { tables })
    }

    /// The traffic incident schema.
    pub fn traffic() -> Self {
        let descriptors = [
            TableDescriptor::new(
                "accident",
                &["AccidentID"],
                &["Severity", "Date", "Time", "VehicleID", "RoadID"],
            ),
            TableDescriptor::new(
                "address",
                &["AddressID"],
                &["UserID", "Pincode", "State", "Country"],
            ),
            TableDescriptor::new("camera", &["CameraID"], &["Status", "LastInspection"]),
            TableDescriptor::new("phonenumber", &["PhoneID"], &["UserID", "PhoneNumber"]),
            TableDescriptor::new("road", &["RoadID"], &["RoadName", "RoadType", "NumLanes"]),
            TableDescriptor::new(
                "roadcamera",
                &["RoadID", "CameraID"],
                &["RoadID", "CameraID"],
            ),
            // UserID may be supplied by staff. Null lets the database assign one.
            TableDescriptor::new("user", &["UserID"], &["UserID", "UserName", "UserRole"]),
            TableDescriptor::new(
                "vehicle",
                &["VehicleID"],
                &["LicensePlate", "VehicleType", "OwnerName"],
            ),
            TableDescriptor::new(
                "vehicleviolation",
                &["VehicleID", "ViolationID"],
                &["VehicleID", "ViolationID"],
            ),
            TableDescriptor::new("violation", &["ViolationID"], &["ViolationType", "FineAmount"]),
        ];

        Catalog {
            tables: descriptors
                .into_iter()
                .map(|d| (d.name.as_str().to_string(), d))
                .collect(),
        }
    }

    pub fn descriptor(&self, table: &str) -> Result<&TableDescriptor> {
        self.tables
            .get(table)
            .ok_or_else(|| EngineError::UnknownTable(table.to_string()))
    }

    pub fn primary_key_of(&self, table: &str) -> Result<&[Ident]> {
        Ok(self.descriptor(table)?.primary_key())
    }

    /// Table names in registration order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|k| k.as_str())
    }

    /// Discover the columns of `table` from the connected database.
    ///
    /// Errors with `UnknownTable` if the table isn't registered, and with
    /// `SchemaFetch` if it's registered but missing from the database.
    pub async fn columns_of(&self, executor: &dyn SqlExecutor, table: &str) -> Result<ColumnSet> {
        let desc = self.descriptor(table)?;

        let stmt = Statement::query(
            executor.dialect().columns_query(),
            vec![ScalarValue::from(desc.name.as_str())],
        );
        let result = executor.execute(&stmt).await?;

        let names = result
            .rows
            .into_iter()
            .map(|row| match row.into_iter().next() {
                Some(ScalarValue::Utf8(name)) => Ok(name),
                Some(ScalarValue::Binary(name)) => String::from_utf8(name)
                    .map_err(|e| EngineError::UnexpectedResult(e.to_string())),
                other => Err(EngineError::UnexpectedResult(format!(
                    "expected column name, got {other:?}"
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        if names.is_empty() {
            return Err(EngineError::SchemaFetch(table.to_string()));
        }
        trace!(%table, ?names, "discovered columns");

        Ok(ColumnSet::from_metadata(desc.name.clone(), names))
    }
}
