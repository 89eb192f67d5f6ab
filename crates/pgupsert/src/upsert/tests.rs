use super::*;
use crate::cancel::cancellation;
use crate::record::{FieldMeta, RecordShape, UpsertPolicy};
use std::time::Duration;
use tokio_postgres::Statement;
use tokio_postgres::types::ToSql;

/// Declares a test record whose fields are all `i64` columns.
macro_rules! test_record {
    ($name:ident { $($field:ident : $key:expr),* $(,)? }) => {
        #[allow(dead_code)]
        struct $name {
            $($field: i64),*
        }

        impl Record for $name {
            fn shape() -> RecordShape {
                RecordShape::record(
                    stringify!($name),
                    vec![$(FieldMeta::column(stringify!($field), None, $key)),*],
                )
            }

            fn values(&self) -> Vec<&(dyn ToSql + Sync)> {
                vec![$(&self.$field as &(dyn ToSql + Sync)),*]
            }
        }
    };
}

// `computed` stands in for a field marked `#[orm(skip)]`: it never reaches
// the shape, so it is simply not declared here.
test_record!(Comment { id: true, created_at: false, description: false });
test_record!(KeyOnly { id: true });
test_record!(KeyAndOne { id: true, x: false });
test_record!(KeyAndTwo { id: true, x: false, y: false });
test_record!(NoKey { a: false, b: false });
test_record!(CompositeKey { tenant_id: true, slug: true, title: false, body: false });

struct PolicyComment;

impl Record for PolicyComment {
    fn shape() -> RecordShape {
        RecordShape::record(
            "PolicyComment",
            vec![
                FieldMeta::column("id", None, true),
                FieldMeta::column("created_at", None, false),
                FieldMeta::column("updated_at", None, false),
                FieldMeta::column("description", None, false),
                FieldMeta::column("computed_column", None, false),
                FieldMeta::column("computed_column3", None, false),
            ],
        )
    }

    fn upsert_policy() -> UpsertPolicy {
        UpsertPolicy::new().skip_columns(["computed_column3"])
    }

    fn values(&self) -> Vec<&(dyn ToSql + Sync)> {
        Vec::new()
    }
}

fn sql_for<T: Record>(table: &str, extra_skip: &[&str]) -> String {
    UpsertStatementBuilder::new()
        .build_for::<T>(table, extra_skip)
        .unwrap()
        .sql()
        .to_string()
}

#[test]
fn comment_example_produces_row_update() {
    let record = Comment {
        id: 1,
        created_at: 2,
        description: 3,
    };
    let stmt = UpsertStatementBuilder::new()
        .build("comment", &record, &[])
        .unwrap();
    assert_eq!(
        stmt.sql(),
        "INSERT INTO comment (id,created_at,description) VALUES(:id,:created_at,:description) \
         ON CONFLICT(id) DO UPDATE SET (created_at,description)=(excluded.created_at,excluded.description)"
    );
    assert_eq!(stmt.conflict_action(), ConflictAction::UpdateRow);
    assert_eq!(stmt.conflict_keys(), ["id"]);
    assert_eq!(stmt.update_columns(), ["created_at", "description"]);
    assert_eq!(stmt.to_string(), stmt.sql());
}

#[test]
fn no_update_columns_means_do_nothing() {
    assert_eq!(
        sql_for::<KeyOnly>("t", &[]),
        "INSERT INTO t (id) VALUES(:id) ON CONFLICT(id) DO NOTHING"
    );
}

#[test]
fn single_update_column_uses_scalar_assignment() {
    let stmt = UpsertStatementBuilder::new()
        .build_for::<KeyAndOne>("t", &[])
        .unwrap();
    assert_eq!(
        stmt.sql(),
        "INSERT INTO t (id,x) VALUES(:id,:x) ON CONFLICT(id) DO UPDATE SET x=excluded.x"
    );
    assert_eq!(stmt.conflict_action(), ConflictAction::UpdateColumn);
}

#[test]
fn several_update_columns_use_row_assignment() {
    assert_eq!(
        sql_for::<KeyAndTwo>("t", &[]),
        "INSERT INTO t (id,x,y) VALUES(:id,:x,:y) ON CONFLICT(id) DO UPDATE SET (x,y)=(excluded.x,excluded.y)"
    );
}

#[test]
fn composite_keys_join_in_field_order() {
    assert_eq!(
        sql_for::<CompositeKey>("posts", &[]),
        "INSERT INTO posts (tenant_id,slug,title,body) VALUES(:tenant_id,:slug,:title,:body) \
         ON CONFLICT(tenant_id,slug) DO UPDATE SET (title,body)=(excluded.title,excluded.body)"
    );
}

#[test]
fn no_key_degenerates_to_plain_insert() {
    let stmt = UpsertStatementBuilder::new()
        .build_for::<NoKey>("events", &[])
        .unwrap();
    assert_eq!(stmt.sql(), "INSERT INTO events (a,b) VALUES(:a,:b)");
    assert!(!stmt.sql().contains("ON CONFLICT"));
    assert_eq!(stmt.conflict_action(), ConflictAction::Insert);
}

#[test]
fn extra_skip_removes_columns_case_insensitively() {
    assert_eq!(
        sql_for::<KeyAndTwo>("t", &["Y"]),
        "INSERT INTO t (id,x) VALUES(:id,:x) ON CONFLICT(id) DO UPDATE SET x=excluded.x"
    );
    assert_eq!(
        sql_for::<KeyAndTwo>("t", &["x", "y"]),
        "INSERT INTO t (id) VALUES(:id) ON CONFLICT(id) DO NOTHING"
    );
}

#[test]
fn skipping_the_key_drops_the_conflict_clause() {
    assert_eq!(
        sql_for::<KeyAndOne>("t", &["ID"]),
        "INSERT INTO t (x) VALUES(:x)"
    );
}

#[test]
fn policy_and_call_level_skips_combine() {
    let stmt = UpsertStatementBuilder::new()
        .build_for::<PolicyComment>("comment", &["computed_column"])
        .unwrap();
    assert_eq!(
        stmt.sql(),
        "INSERT INTO comment (id,created_at,updated_at,description) \
         VALUES(:id,:created_at,:updated_at,:description) \
         ON CONFLICT(id) DO UPDATE SET (created_at,updated_at,description)=\
         (excluded.created_at,excluded.updated_at,excluded.description)"
    );

    // without the call-level skip the column is present
    let stmt = UpsertStatementBuilder::new()
        .build_for::<PolicyComment>("comment", &[])
        .unwrap();
    assert!(stmt.columns().find("computed_column").is_some());
    assert!(stmt.columns().find("computed_column3").is_none());
}

#[test]
fn builder_propagates_type_shape_errors() {
    struct Scalar;
    impl Record for Scalar {
        fn shape() -> RecordShape {
            RecordShape::opaque("Scalar")
        }
        fn values(&self) -> Vec<&(dyn ToSql + Sync)> {
            Vec::new()
        }
    }

    let err = UpsertStatementBuilder::new()
        .build("t", &Scalar, &[])
        .unwrap_err();
    assert!(err.is_type_shape());
}

#[test]
fn custom_name_mapper_flows_into_sql() {
    fn upper(ident: &str) -> String {
        ident.to_uppercase()
    }
    assert_eq!(
        UpsertStatementBuilder::with_name_mapper(upper)
            .build_for::<KeyAndOne>("t", &[])
            .unwrap()
            .sql(),
        "INSERT INTO t (ID,X) VALUES(:ID,:X) ON CONFLICT(ID) DO UPDATE SET X=excluded.X"
    );
}

#[test]
fn bindings_resolve_to_field_positions() {
    let stmt = UpsertStatementBuilder::new()
        .build_for::<KeyAndTwo>("t", &["x"])
        .unwrap();
    let positional = stmt.to_positional();
    assert_eq!(
        positional.sql,
        "INSERT INTO t (id,y) VALUES($1,$2) ON CONFLICT(id) DO UPDATE SET y=excluded.y"
    );
    assert_eq!(positional.names, vec!["id", "y"]);
    // `x` is skipped but still occupies value slot 1
    assert_eq!(stmt.resolve_bindings(&positional.names).unwrap(), vec![0, 2]);
}

#[test]
fn non_ascii_columns_resolve_to_their_fields() {
    struct Produit;
    impl Record for Produit {
        fn shape() -> RecordShape {
            RecordShape::record(
                "Produit",
                vec![
                    FieldMeta::column("id", None, true),
                    FieldMeta::column("cafe", Some("café"), false),
                ],
            )
        }
        fn values(&self) -> Vec<&(dyn ToSql + Sync)> {
            Vec::new()
        }
    }

    let stmt = UpsertStatementBuilder::new()
        .build_for::<Produit>("produit", &[])
        .unwrap();
    let positional = stmt.to_positional();
    assert_eq!(
        positional.sql,
        "INSERT INTO produit (id,café) VALUES($1,$2) ON CONFLICT(id) DO UPDATE SET café=excluded.café"
    );
    assert_eq!(stmt.resolve_bindings(&positional.names).unwrap(), vec![0, 1]);
}

#[test]
fn unknown_placeholder_is_a_bind_error() {
    let stmt = UpsertStatementBuilder::new()
        .build_for::<KeyOnly>("t", &[])
        .unwrap();
    let err = stmt
        .resolve_bindings(&["missing".to_string()])
        .unwrap_err();
    assert!(matches!(err, UpsertError::Bind(_)));
}

#[test]
fn bind_params_reports_missing_values() {
    let a = 1_i64;
    let values: Vec<&(dyn ToSql + Sync)> = vec![&a];
    let params = prepared::bind_params(&values, &[0], &["a".to_string()]).unwrap();
    assert_eq!(params.len(), 1);

    let err = prepared::bind_params(&values, &[3], &["z".to_string()]).unwrap_err();
    assert!(err.to_string().contains(":z"));
}

struct PendingClient;

impl GenericClient for PendingClient {
    async fn execute(&self, _sql: &str, _params: &[&(dyn ToSql + Sync)]) -> UpsertResult<u64> {
        std::future::pending().await
    }

    async fn prepare_statement(&self, _sql: &str) -> UpsertResult<Statement> {
        std::future::pending().await
    }

    async fn execute_prepared(
        &self,
        _stmt: &Statement,
        _params: &[&(dyn ToSql + Sync)],
    ) -> UpsertResult<u64> {
        std::future::pending().await
    }
}

struct RejectingClient;

impl GenericClient for RejectingClient {
    async fn execute(&self, _sql: &str, _params: &[&(dyn ToSql + Sync)]) -> UpsertResult<u64> {
        Err(UpsertError::Connection("connection closed".into()))
    }

    async fn prepare_statement(&self, _sql: &str) -> UpsertResult<Statement> {
        Err(UpsertError::Connection("relation \"t\" does not exist".into()))
    }

    async fn execute_prepared(
        &self,
        _stmt: &Statement,
        _params: &[&(dyn ToSql + Sync)],
    ) -> UpsertResult<u64> {
        Err(UpsertError::Connection("connection closed".into()))
    }
}

#[tokio::test]
async fn prepare_fails_immediately_when_already_cancelled() {
    let (handle, cancel) = cancellation();
    handle.cancel();

    let err = UpsertStatementBuilder::new()
        .prepare(&PendingClient, &cancel, "t", &KeyOnly { id: 1 }, &[])
        .await
        .unwrap_err();
    assert!(err.is_store_prepare());
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn cancellation_interrupts_pending_prepare() {
    let (handle, cancel) = cancellation();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();
    });

    let res = tokio::time::timeout(
        Duration::from_secs(1),
        UpsertStatementBuilder::new().prepare(&PendingClient, &cancel, "t", &KeyOnly { id: 1 }, &[]),
    )
    .await
    .expect("prepare should observe cancellation");
    let err = res.unwrap_err();
    assert!(err.is_store_prepare());
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn store_rejection_is_wrapped_with_sql() {
    let cancel = Cancellation::never();
    let err = UpsertStatementBuilder::new()
        .prepare(&RejectingClient, &cancel, "t", &KeyAndOne { id: 1, x: 2 }, &[])
        .await
        .unwrap_err();

    match err {
        UpsertError::StorePrepare { sql, source } => {
            assert_eq!(
                sql,
                "INSERT INTO t (id,x) VALUES($1,$2) ON CONFLICT(id) DO UPDATE SET x=excluded.x"
            );
            assert!(matches!(*source, UpsertError::Connection(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
