//! Record metadata traits and types.
//!
//! A [`Record`] describes its persisted fields through a [`RecordShape`]. The
//! shape is normally produced by `#[derive(Record)]`; implementing the trait by
//! hand acts as an explicit registration table for types the derive cannot see.

use std::rc::Rc;
use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// Static description of a single struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    /// Rust field identifier (diagnostics only).
    pub field_name: &'static str,
    /// Explicit `#[orm(column = "...")]` override.
    pub column: Option<&'static str>,
    /// Field carries the `#[orm(key)]` marker.
    pub key: bool,
    pub kind: FieldKind,
}

/// Whether a field maps to one column or splices a nested record in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Column,
    Flatten(RecordShape),
}

impl FieldMeta {
    /// A field that becomes a single column.
    pub fn column(field_name: &'static str, column: Option<&'static str>, key: bool) -> Self {
        Self {
            field_name,
            column,
            key,
            kind: FieldKind::Column,
        }
    }

    /// A field whose own fields are spliced in at this position.
    pub fn flatten(field_name: &'static str, shape: RecordShape) -> Self {
        Self {
            field_name,
            column: None,
            key: false,
            kind: FieldKind::Flatten(shape),
        }
    }
}

/// The static shape of a type as seen by the column introspector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordShape {
    /// A struct with named fields, in declaration order.
    Record {
        type_name: &'static str,
        fields: Vec<FieldMeta>,
    },
    /// Anything else. Introspecting it fails with a type shape error.
    Opaque { type_name: &'static str },
}

impl RecordShape {
    pub fn record(type_name: &'static str, fields: Vec<FieldMeta>) -> Self {
        Self::Record { type_name, fields }
    }

    pub fn opaque(type_name: &'static str) -> Self {
        Self::Opaque { type_name }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Record { type_name, .. } | Self::Opaque { type_name } => type_name,
        }
    }

    /// Field list, or `None` when the shape is not record-like.
    pub fn fields(&self) -> Option<&[FieldMeta]> {
        match self {
            Self::Record { fields, .. } => Some(fields),
            Self::Opaque { .. } => None,
        }
    }
}

/// Per-type override of conflict keys and skipped columns.
///
/// When `conflict_keys` is non-empty it replaces every field-level key marker
/// outright. Column names are matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertPolicy {
    pub conflict_keys: Vec<String>,
    pub skip_columns: Vec<String>,
}

impl UpsertPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the explicit conflict target columns.
    pub fn conflict_keys<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conflict_keys = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the columns that are never emitted for this type.
    pub fn skip_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn skips(&self, column: &str) -> bool {
        crate::naming::contains_column(&self.skip_columns, column)
    }

    pub fn has_conflict_keys(&self) -> bool {
        !self.conflict_keys.is_empty()
    }

    pub fn is_conflict_key(&self, column: &str) -> bool {
        crate::naming::contains_column(&self.conflict_keys, column)
    }
}

/// A type whose fields can be persisted as table columns.
///
/// # Example
///
/// ```ignore
/// use pgupsert::Record;
///
/// #[derive(Record)]
/// pub struct Comment {
///     #[orm(key)]
///     pub id: i64,
///     pub description: String,
/// }
/// ```
pub trait Record {
    /// Field metadata in declaration order.
    fn shape() -> RecordShape;

    /// Conflict key and skip overrides. Defaults to none, which leaves
    /// conflict detection to the `#[orm(key)]` field markers.
    fn upsert_policy() -> UpsertPolicy {
        UpsertPolicy::default()
    }

    /// One value per column field, in the same flattened order as
    /// [`Record::shape`] (nested records spliced in place).
    fn values(&self) -> Vec<&(dyn ToSql + Sync)>;
}

macro_rules! forward_record {
    ($($wrapper:ty),+ $(,)?) => {
        $(impl<T: Record> Record for $wrapper {
            fn shape() -> RecordShape {
                T::shape()
            }

            fn upsert_policy() -> UpsertPolicy {
                T::upsert_policy()
            }

            fn values(&self) -> Vec<&(dyn ToSql + Sync)> {
                (**self).values()
            }
        })+
    };
}

forward_record!(Box<T>, Arc<T>, Rc<T>);

impl<T: Record> Record for &T {
    fn shape() -> RecordShape {
        T::shape()
    }

    fn upsert_policy() -> UpsertPolicy {
        T::upsert_policy()
    }

    fn values(&self) -> Vec<&(dyn ToSql + Sync)> {
        (**self).values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point {
        x: i32,
        y: i32,
    }

    impl Record for Point {
        fn shape() -> RecordShape {
            RecordShape::record(
                "Point",
                vec![
                    FieldMeta::column("x", None, true),
                    FieldMeta::column("y", None, false),
                ],
            )
        }

        fn values(&self) -> Vec<&(dyn ToSql + Sync)> {
            vec![&self.x as &(dyn ToSql + Sync), &self.y]
        }
    }

    #[test]
    fn wrappers_forward_to_inner_record() {
        assert_eq!(<Box<Point>>::shape(), Point::shape());
        assert_eq!(<Arc<Point>>::shape(), Point::shape());
        assert_eq!(<&Point>::shape(), Point::shape());

        let boxed = Box::new(Point { x: 1, y: 2 });
        assert_eq!(boxed.values().len(), 2);
    }

    #[test]
    fn opaque_shape_has_no_fields() {
        let shape = RecordShape::opaque("i64");
        assert_eq!(shape.type_name(), "i64");
        assert!(shape.fields().is_none());
        assert_eq!(Point::shape().fields().map(<[FieldMeta]>::len), Some(2));
    }

    #[test]
    fn policy_matches_case_insensitively() {
        let policy = UpsertPolicy::new()
            .conflict_keys(["ID"])
            .skip_columns(vec!["Computed".to_string()]);
        assert!(policy.has_conflict_keys());
        assert!(policy.is_conflict_key("id"));
        assert!(policy.skips("computed"));
        assert!(!policy.skips("id"));
        assert!(!UpsertPolicy::default().has_conflict_keys());
    }
}
