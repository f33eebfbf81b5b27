//! Identifier validation.
//!
//! Every table or column name that ends up in statement text is an [`Ident`],
//! and an `Ident` can only be created from the catalog or from schema
//! metadata returned by the database. Names coming from callers are looked up
//! against those sources and the looked-up spelling is what gets rendered.

use std::fmt;

use crate::catalog::{Catalog, ColumnSet, TableDescriptor};
use crate::errors::{EngineError, Result};

/// A table or column name that is safe to place in SQL text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    pub(crate) fn from_catalog(name: impl Into<String>) -> Self {
        Ident(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Names allowed in a static table descriptor.
    pub(crate) fn is_plain(name: &str) -> bool {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !name.starts_with(|c: char| c.is_ascii_digit())
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Whitelist check for table names.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    catalog: &'a Catalog,
}

impl<'a> Validator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Validator { catalog }
    }

    /// Return the descriptor for `table` if it is one of the supported tables.
    pub fn validate(&self, table: &str) -> Result<&'a TableDescriptor> {
        self.catalog
            .descriptor(table)
            .map_err(|_| EngineError::UnsupportedTable(table.to_string()))
    }

    /// Resolve a caller supplied column name against live column metadata.
    ///
    /// Exact matches win. Otherwise an ASCII case-insensitive match is
    /// accepted, since MySQL column names are case-insensitive.
    pub fn resolve_column<'c>(&self, columns: &'c ColumnSet, requested: &str) -> Result<&'c Ident> {
        columns
            .iter()
            .find(|c| c.as_str() == requested)
            .or_else(|| {
                columns
                    .iter()
                    .find(|c| c.as_str().eq_ignore_ascii_case(requested))
            })
            .ok_or_else(|| EngineError::UnknownColumn {
                table: columns.table().to_string(),
                column: requested.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_identifiers() {
        assert!(Ident::is_plain("vehicleviolation"));
        assert!(Ident::is_plain("Fine_Amount2"));
        assert!(!Ident::is_plain(""));
        assert!(!Ident::is_plain("2fast"));
        assert!(!Ident::is_plain("user; DROP TABLE user"));
        assert!(!Ident::is_plain("road`"));
    }

    #[test]
    fn validate_rejects_unknown_tables() {
        let catalog = Catalog::traffic();
        let validator = Validator::new(&catalog);

        let desc = validator.validate("roadcamera").unwrap();
        assert_eq!("roadcamera", desc.name().as_str());

        let err = validator.validate("accident; DROP TABLE road").unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedTable(_)));

        // Lookups are exact.
        let err = validator.validate("Accident").unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedTable(_)));
    }

    #[test]
    fn resolve_column_uses_metadata_spelling() {
        let catalog = Catalog::traffic();
        let validator = Validator::new(&catalog);
        let columns = ColumnSet::from_metadata(
            Ident::from_catalog("violation"),
            ["ViolationID", "ViolationType", "FineAmount"],
        );

        let col = validator.resolve_column(&columns, "fineamount").unwrap();
        assert_eq!("FineAmount", col.as_str());

        let err = validator
            .resolve_column(&columns, "FineAmount = 0 --")
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownColumn { .. }));
    }
}
