//! Column introspection.
//!
//! [`ColumnIntrospector`] walks a [`Record`]'s static shape and produces the
//! ordered [`ColumnSet`] that statement synthesis works from. Nothing is cached:
//! every call walks the shape again.
//!
//! Rules, applied per field in declaration order:
//!
//! - `#[orm(skip)]` and private fields are absent from the shape entirely
//! - `#[orm(flatten)]` fields are walked recursively and spliced in place
//! - the column name is the `#[orm(column)]` override, or the mapped field name
//! - columns listed in the policy's `skip_columns` are dropped
//! - conflict keys come from the policy when it lists any, otherwise from
//!   `#[orm(key)]` markers

use crate::error::{UpsertError, UpsertResult};
use crate::naming::{self, NameMapper};
use crate::record::{FieldKind, Record, RecordShape, UpsertPolicy};

/// One persisted field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Source field identifier (diagnostics only, never used in SQL).
    pub field_name: &'static str,
    /// Store-side column name.
    pub column_name: String,
    /// Part of the conflict target.
    pub is_conflict_key: bool,
    /// Position of this field's value in [`Record::values`].
    pub field_index: usize,
}

/// Ordered column descriptors for one record type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet {
    columns: Vec<ColumnDescriptor>,
}

impl ColumnSet {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnDescriptor> {
        self.columns.iter()
    }

    pub fn as_slice(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Conflict key column names, in field order.
    pub fn conflict_key_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_conflict_key)
            .map(|c| c.column_name.as_str())
            .collect()
    }

    /// All column names, in field order.
    pub fn all_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.column_name.as_str())
            .collect()
    }

    /// Look up a column by name (case-insensitive).
    pub fn find(&self, column: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| naming::eq_column(&c.column_name, column))
    }

    /// Copy of this set without the given columns (case-insensitive).
    pub fn without<S: AsRef<str>>(&self, skip: &[S]) -> ColumnSet {
        if skip.is_empty() {
            return self.clone();
        }
        Self {
            columns: self
                .columns
                .iter()
                .filter(|c| !naming::contains_column(skip, &c.column_name))
                .cloned()
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ColumnSet {
    type Item = &'a ColumnDescriptor;
    type IntoIter = std::slice::Iter<'a, ColumnDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

/// Derives a [`ColumnSet`] from a record type's static shape.
#[derive(Debug, Clone, Copy)]
pub struct ColumnIntrospector {
    name_mapper: NameMapper,
}

impl Default for ColumnIntrospector {
    fn default() -> Self {
        Self {
            name_mapper: naming::snake_case,
        }
    }
}

impl ColumnIntrospector {
    /// Introspector using [`naming::snake_case`] for unannotated fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Introspector using a custom naming convention for unannotated fields.
    pub fn with_name_mapper(name_mapper: NameMapper) -> Self {
        Self { name_mapper }
    }

    pub fn name_mapper(&self) -> NameMapper {
        self.name_mapper
    }

    /// Derive the column set of `T`.
    ///
    /// The policy of `T` governs the whole walk, including flattened fields.
    pub fn introspect<T: Record>(&self) -> UpsertResult<ColumnSet> {
        self.introspect_shape(&T::shape(), &T::upsert_policy())
    }

    /// Derive a column set from an explicit shape and policy.
    pub fn introspect_shape(
        &self,
        shape: &RecordShape,
        policy: &UpsertPolicy,
    ) -> UpsertResult<ColumnSet> {
        let Some(fields) = shape.fields() else {
            return Err(UpsertError::type_shape(
                shape.type_name(),
                "only structs are supported",
            ));
        };

        let mut columns = Vec::with_capacity(fields.len());
        let mut next_index = 0_usize;
        self.fill_columns(shape, policy, &mut next_index, &mut columns)?;
        check_duplicates(shape.type_name(), &columns)?;

        tracing::trace!(
            target: "pgupsert.columns",
            type_name = shape.type_name(),
            columns = columns.len(),
            "introspected record columns"
        );

        Ok(ColumnSet { columns })
    }

    fn fill_columns(
        &self,
        shape: &RecordShape,
        policy: &UpsertPolicy,
        next_index: &mut usize,
        columns: &mut Vec<ColumnDescriptor>,
    ) -> UpsertResult<()> {
        let Some(fields) = shape.fields() else {
            return Err(UpsertError::type_shape(
                shape.type_name(),
                "not a struct or a pointer to struct",
            ));
        };

        for field in fields {
            if let FieldKind::Flatten(inner) = &field.kind {
                self.fill_columns(inner, policy, next_index, columns)?;
                continue;
            }

            // Values are indexed by field position whether or not the column
            // survives the policy skip list.
            let field_index = *next_index;
            *next_index += 1;

            let column_name = match field.column {
                Some(column) => column.to_string(),
                None => (self.name_mapper)(field.field_name),
            };

            if policy.skips(&column_name) {
                continue;
            }

            let is_conflict_key = if policy.has_conflict_keys() {
                policy.is_conflict_key(&column_name)
            } else {
                field.key
            };

            columns.push(ColumnDescriptor {
                field_name: field.field_name,
                column_name,
                is_conflict_key,
                field_index,
            });
        }

        Ok(())
    }
}

fn check_duplicates(type_name: &str, columns: &[ColumnDescriptor]) -> UpsertResult<()> {
    for (i, column) in columns.iter().enumerate() {
        if let Some(previous) = columns[..i]
            .iter()
            .find(|c| naming::eq_column(&c.column_name, &column.column_name))
        {
            return Err(UpsertError::type_shape(
                type_name,
                format!(
                    "duplicate column '{}' (fields '{}' and '{}')",
                    column.column_name, previous.field_name, column.field_name
                ),
            ));
        }
    }
    Ok(())
}
