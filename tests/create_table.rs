use proptest::prelude::*;
use sqlschema::catalog::schema::{ForeignKeyReference, InterleaveAncestor, InterleaveReference};
use sqlschema::catalog::types::{ColumnKind, ColumnType, IndexDirection, TableState};
use sqlschema::ddl::ast::{
    ColumnTableDef, CreateDatabase, CreateTable, DropBehavior, IndexElem, IndexTableDef,
    InterleaveDef, Statement, TableDef, TableName,
};
use sqlschema::error::ErrorClass;
use sqlschema::schema_change::NoopNotifier;
use sqlschema::{
    Descriptor, DescriptorKey, Executor, MemoryStore, SchemaConfig, Session, TableDescriptor,
};
use std::sync::Arc;

fn setup() -> (Executor, Session) {
    let config = SchemaConfig::default();
    let store = MemoryStore::new(&config);
    let executor = Executor::new(store, config, Arc::new(NoopNotifier)).expect("executor");
    let session = Session::new("root").with_database("d");
    executor
        .execute(
            &session,
            &Statement::CreateDatabase(CreateDatabase {
                name: "d".into(),
                if_not_exists: false,
                encoding: None,
            }),
        )
        .expect("create database");
    (executor, session)
}

fn create_table(name: &str, defs: Vec<TableDef>) -> Statement {
    Statement::CreateTable(CreateTable {
        table: TableName::new(name),
        if_not_exists: false,
        defs,
        interleave: None,
    })
}

fn interleaved_table(name: &str, defs: Vec<TableDef>, parent: &str, fields: &[&str]) -> Statement {
    Statement::CreateTable(CreateTable {
        table: TableName::new(name),
        if_not_exists: false,
        defs,
        interleave: Some(InterleaveDef::new(TableName::new(parent), fields)),
    })
}

fn col(name: &str) -> TableDef {
    TableDef::Column(ColumnTableDef::new(name, ColumnType::int()))
}

fn pk(name: &str) -> TableDef {
    TableDef::Column(ColumnTableDef::new(name, ColumnType::int()).primary_key())
}

fn table(executor: &Executor, name: &str) -> TableDescriptor {
    let store = executor.store();
    let db = store
        .get_descriptor_id(&DescriptorKey::database("d"))
        .expect("database exists");
    let id = store
        .get_descriptor_id(&DescriptorKey::table(db, name))
        .expect("table exists");
    store
        .get_descriptor(id)
        .expect("read descriptor")
        .and_then(Descriptor::into_table)
        .expect("table descriptor")
}

fn assert_links_consistent(executor: &Executor, names: &[&str]) {
    for name in names {
        let t = table(executor, name);
        t.validate().expect("valid");
        t.validate_cross_references(|id| {
            executor
                .store()
                .get_descriptor(id)
                .ok()
                .flatten()
                .and_then(Descriptor::into_table)
        })
        .expect("cross references consistent");
    }
}

#[test]
fn table_without_primary_key_gets_hidden_rowid() {
    let (executor, session) = setup();
    executor
        .execute(&session, &create_table("t", vec![col("a"), col("b")]))
        .expect("create");

    let t = table(&executor, "t");
    let rowid = t.find_column_by_name("rowid").expect("rowid");
    assert!(rowid.hidden);
    assert!(!rowid.nullable);
    assert_eq!(rowid.col_type, ColumnType::int());
    assert_eq!(rowid.default_expr.as_deref(), Some("unique_rowid()"));
    assert_eq!(t.primary_index.column_ids, vec![rowid.id]);
    assert!(t.primary_index.unique);
    assert_eq!(t.primary_index.name, "primary");
    assert_eq!(t.state, TableState::Public);
    assert_eq!(t.version, 1);
}

#[test]
fn explicit_primary_key_suppresses_rowid() {
    let (executor, session) = setup();
    executor
        .execute(&session, &create_table("t", vec![pk("a"), col("b")]))
        .expect("create");
    let t = table(&executor, "t");
    assert!(t.find_column_by_name("rowid").is_none());
    assert_eq!(t.primary_index.column_names, vec!["a"]);
    assert!(!t.find_column_by_name("a").expect("a").nullable);
    assert!(t.find_column_by_name("b").expect("b").nullable);
}

#[test]
fn missing_database_and_duplicate_table_are_reported() {
    let (executor, session) = setup();
    let err = executor
        .execute(
            &session,
            &Statement::CreateTable(CreateTable {
                table: TableName::qualified("nope", "t"),
                if_not_exists: false,
                defs: vec![pk("a")],
                interleave: None,
            }),
        )
        .expect_err("no database");
    assert_eq!(err.class(), ErrorClass::NotFound);

    executor
        .execute(&session, &create_table("t", vec![pk("a")]))
        .expect("create");
    let err = executor
        .execute(&session, &create_table("t", vec![pk("a")]))
        .expect_err("duplicate");
    assert_eq!(err.code_str(), "table_already_exists");
    assert_eq!(err.class(), ErrorClass::Conflict);
}

#[test]
fn if_not_exists_on_existing_table_is_a_no_op() {
    let (executor, session) = setup();
    executor
        .execute(&session, &create_table("abc", vec![pk("a")]))
        .expect("create abc");
    executor
        .execute(&session, &create_table("t", vec![pk("a")]))
        .expect("create t");
    let before = table(&executor, "abc");
    let events = executor.store().events().len();

    let again = Statement::CreateTable(CreateTable {
        table: TableName::new("t"),
        if_not_exists: true,
        defs: vec![TableDef::Column(
            ColumnTableDef::new("a", ColumnType::int())
                .primary_key()
                .references(TableName::new("abc"), None),
        )],
        interleave: None,
    });
    executor.execute(&session, &again).expect("no-op");

    assert_eq!(table(&executor, "abc"), before);
    assert!(table(&executor, "t").primary_index.foreign_key.is_none());
    assert_eq!(executor.store().events().len(), events);
}

#[test]
fn foreign_key_links_both_sides() {
    let (executor, session) = setup();
    executor
        .execute(&session, &create_table("abc", vec![pk("a"), col("b"), col("c")]))
        .expect("create abc");
    executor
        .execute(
            &session,
            &create_table(
                "xyz",
                vec![
                    TableDef::Column(
                        ColumnTableDef::new("x", ColumnType::int())
                            .primary_key()
                            .references(TableName::new("abc"), Some("a")),
                    ),
                    col("y"),
                    col("z"),
                ],
            ),
        )
        .expect("create xyz");

    let abc = table(&executor, "abc");
    let xyz = table(&executor, "xyz");
    assert_eq!(
        xyz.primary_index.foreign_key,
        Some(ForeignKeyReference {
            table: abc.id,
            index: abc.primary_index.id,
            name: "fk_x_ref_abc_a".into(),
        })
    );
    assert_eq!(abc.primary_index.referenced_by.len(), 1);
    assert_eq!(abc.primary_index.referenced_by[0].table, xyz.id);
    assert_eq!(abc.primary_index.referenced_by[0].index, xyz.primary_index.id);
    assert_eq!(xyz.state, TableState::Public);
    assert_eq!(abc.version, 2);
    assert_links_consistent(&executor, &["abc", "xyz"]);
}

#[test]
fn self_referencing_foreign_key_uses_real_id() {
    let (executor, session) = setup();
    executor
        .execute(
            &session,
            &create_table(
                "emp",
                vec![
                    pk("id"),
                    TableDef::Column(
                        ColumnTableDef::new("manager", ColumnType::int())
                            .references(TableName::new("emp"), Some("id")),
                    ),
                    TableDef::Index(IndexTableDef::index(None, vec![IndexElem::asc("manager")])),
                ],
            ),
        )
        .expect("create emp");

    let emp = table(&executor, "emp");
    let by_manager = &emp.indexes[0];
    assert_eq!(by_manager.name, "emp_manager_idx");
    let forward = by_manager.foreign_key.as_ref().expect("forward reference");
    assert_eq!(forward.table, emp.id);
    assert_eq!(forward.index, emp.primary_index.id);
    assert_eq!(emp.primary_index.referenced_by[0].table, emp.id);
    assert_eq!(emp.primary_index.referenced_by[0].index, by_manager.id);
    assert_eq!(emp.state, TableState::Public);
    assert_links_consistent(&executor, &["emp"]);
}

#[test]
fn foreign_key_defaults_to_single_column_primary_key() {
    let (executor, session) = setup();
    executor
        .execute(&session, &create_table("abc", vec![pk("a")]))
        .expect("create abc");
    executor
        .execute(
            &session,
            &create_table(
                "xyz",
                vec![TableDef::Column(
                    ColumnTableDef::new("x", ColumnType::int())
                        .primary_key()
                        .references_named(TableName::new("abc"), None, "xyz_abc"),
                )],
            ),
        )
        .expect("create xyz");
    let xyz = table(&executor, "xyz");
    let forward = xyz.primary_index.foreign_key.expect("forward reference");
    assert_eq!(forward.name, "xyz_abc");
}

#[test]
fn foreign_key_errors_leave_target_untouched() {
    let (executor, session) = setup();
    executor
        .execute(
            &session,
            &create_table(
                "abc",
                vec![
                    pk("a"),
                    col("b"),
                    TableDef::Column(ColumnTableDef::new("s", ColumnType::string())),
                ],
            ),
        )
        .expect("create abc");
    let before = table(&executor, "abc");

    let referencing = |column: ColumnTableDef, extra: Vec<TableDef>| {
        let mut defs = vec![TableDef::Column(column)];
        defs.extend(extra);
        create_table("bad", defs)
    };

    let mismatched = referencing(
        ColumnTableDef::new("x", ColumnType::string())
            .primary_key()
            .references(TableName::new("abc"), Some("a")),
        vec![],
    );
    let err = executor.execute(&session, &mismatched).expect_err("type mismatch");
    assert_eq!(err.class(), ErrorClass::InvalidArgument);
    assert!(err.to_string().contains("does not match foreign key"));

    let not_unique = referencing(
        ColumnTableDef::new("x", ColumnType::int())
            .primary_key()
            .references(TableName::new("abc"), Some("b")),
        vec![],
    );
    let err = executor.execute(&session, &not_unique).expect_err("not unique");
    assert!(err.to_string().contains("requires a unique index"));

    let not_prefix = referencing(
        ColumnTableDef::new("x", ColumnType::int()).references(TableName::new("abc"), Some("a")),
        vec![pk("id")],
    );
    let err = executor.execute(&session, &not_prefix).expect_err("no index");
    assert!(err.to_string().contains("must be the prefix of an index"));

    let missing = referencing(
        ColumnTableDef::new("x", ColumnType::int())
            .primary_key()
            .references(TableName::new("nope"), None),
        vec![],
    );
    let err = executor.execute(&session, &missing).expect_err("missing target");
    assert_eq!(err.class(), ErrorClass::NotFound);

    assert_eq!(table(&executor, "abc"), before);
    let db = executor
        .store()
        .get_descriptor_id(&DescriptorKey::database("d"))
        .expect("database");
    assert!(
        executor
            .store()
            .get_descriptor_id(&DescriptorKey::table(db, "bad"))
            .is_none()
    );
}

#[test]
fn multiple_references_into_one_target() {
    let (executor, session) = setup();
    executor
        .execute(
            &session,
            &create_table(
                "target",
                vec![
                    pk("id"),
                    TableDef::Column(ColumnTableDef::new("code", ColumnType::int()).unique()),
                ],
            ),
        )
        .expect("create target");
    executor
        .execute(
            &session,
            &create_table(
                "src",
                vec![
                    TableDef::Column(
                        ColumnTableDef::new("a", ColumnType::int())
                            .primary_key()
                            .references(TableName::new("target"), None),
                    ),
                    TableDef::Column(
                        ColumnTableDef::new("b", ColumnType::int())
                            .unique()
                            .references(TableName::new("target"), Some("code")),
                    ),
                ],
            ),
        )
        .expect("create src");

    let target = table(&executor, "target");
    let src = table(&executor, "src");
    // One write of the target per statement: created at 1, updated once.
    assert_eq!(target.version, 2);
    assert_eq!(target.primary_index.referenced_by.len(), 1);
    assert_eq!(target.indexes[0].referenced_by.len(), 1);
    assert_eq!(target.indexes[0].referenced_by[0].index, src.indexes[0].id);
    assert_links_consistent(&executor, &["target", "src"]);
}

#[test]
fn interleaved_child_links_to_parent() {
    let (executor, session) = setup();
    executor
        .execute(&session, &create_table("parent", vec![pk("k")]))
        .expect("create parent");
    executor
        .execute(
            &session,
            &interleaved_table("child", vec![pk("k"), col("v")], "parent", &["k"]),
        )
        .expect("create child");

    let parent = table(&executor, "parent");
    let child = table(&executor, "child");
    assert_eq!(
        child.primary_index.interleave.ancestors,
        vec![InterleaveAncestor {
            table_id: parent.id,
            index_id: parent.primary_index.id,
            shared_prefix_len: 1,
        }]
    );
    assert_eq!(
        parent.primary_index.interleaved_by,
        vec![InterleaveReference {
            table: child.id,
            index: child.primary_index.id,
        }]
    );
    assert_links_consistent(&executor, &["parent", "child"]);
}

#[test]
fn child_referencing_and_interleaved_in_parent() {
    let (executor, session) = setup();
    executor
        .execute(&session, &create_table("parent", vec![pk("k")]))
        .expect("create parent");
    executor
        .execute(
            &session,
            &interleaved_table(
                "child",
                vec![
                    TableDef::Column(
                        ColumnTableDef::new("k", ColumnType::int())
                            .primary_key()
                            .references(TableName::new("parent"), None),
                    ),
                    col("v"),
                ],
                "parent",
                &["k"],
            ),
        )
        .expect("create child");

    let parent = table(&executor, "parent");
    let child = table(&executor, "child");
    assert_eq!(parent.version, 2);
    assert_eq!(parent.primary_index.referenced_by.len(), 1);
    assert_eq!(parent.primary_index.referenced_by[0].table, child.id);
    assert_eq!(
        parent.primary_index.interleaved_by,
        vec![InterleaveReference {
            table: child.id,
            index: child.primary_index.id,
        }]
    );
    assert_eq!(child.state, TableState::Public);
    assert_links_consistent(&executor, &["parent", "child"]);
}

#[test]
fn interleave_chains_telescope() {
    let (executor, session) = setup();
    executor
        .execute(&session, &create_table("p", vec![pk("a")]))
        .expect("create p");
    executor
        .execute(
            &session,
            &interleaved_table(
                "c",
                vec![
                    col("a"),
                    col("b"),
                    TableDef::Index(IndexTableDef::primary_key(vec![
                        IndexElem::asc("a"),
                        IndexElem::asc("b"),
                    ])),
                ],
                "p",
                &["a"],
            ),
        )
        .expect("create c");
    executor
        .execute(
            &session,
            &interleaved_table(
                "g",
                vec![
                    col("a"),
                    col("b"),
                    col("c"),
                    TableDef::Index(IndexTableDef::primary_key(vec![
                        IndexElem::asc("a"),
                        IndexElem::asc("b"),
                        IndexElem::asc("c"),
                    ])),
                ],
                "c",
                &["a", "B"],
            ),
        )
        .expect("create g");

    let p = table(&executor, "p");
    let c = table(&executor, "c");
    let g = table(&executor, "g");
    let chain = &g.primary_index.interleave.ancestors;
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].table_id, p.id);
    assert_eq!(chain[0].shared_prefix_len, 1);
    assert_eq!(chain[1].table_id, c.id);
    assert_eq!(chain[1].shared_prefix_len, 1);
    assert_eq!(g.primary_index.interleave.total_shared_prefix_len(), 2);
    assert_eq!(p.primary_index.interleaved_by.len(), 2);
    assert_eq!(c.primary_index.interleaved_by.len(), 1);
    assert_links_consistent(&executor, &["p", "c", "g"]);
}

#[test]
fn interleave_shape_errors() {
    let (executor, session) = setup();
    executor
        .execute(&session, &create_table("parent", vec![pk("k")]))
        .expect("create parent");

    let wrong_type = interleaved_table(
        "child",
        vec![TableDef::Column(
            ColumnTableDef::new("k", ColumnType::string()).primary_key(),
        )],
        "parent",
        &["k"],
    );
    let err = executor.execute(&session, &wrong_type).expect_err("type");
    assert!(err.to_string().contains("interleaved columns must match parent"));

    let wrong_direction = interleaved_table(
        "child",
        vec![
            col("k"),
            TableDef::Index(IndexTableDef::primary_key(vec![IndexElem::desc("k")])),
        ],
        "parent",
        &["k"],
    );
    let err = executor.execute(&session, &wrong_direction).expect_err("direction");
    assert!(err.to_string().contains("interleaved columns must match parent"));

    let wrong_name = interleaved_table("child", vec![pk("j")], "parent", &["k"]);
    let err = executor.execute(&session, &wrong_name).expect_err("name");
    assert!(err.to_string().contains("declared columns must match"));

    let too_many = interleaved_table("child", vec![pk("k")], "parent", &["k", "v"]);
    let err = executor.execute(&session, &too_many).expect_err("count");
    assert_eq!(err.class(), ErrorClass::InvalidArgument);

    let mut cascade = InterleaveDef::new(TableName::new("parent"), &["k"]);
    cascade.drop_behavior = DropBehavior::Cascade;
    let err = executor
        .execute(
            &session,
            &Statement::CreateTable(CreateTable {
                table: TableName::new("child"),
                if_not_exists: false,
                defs: vec![pk("k")],
                interleave: Some(cascade),
            }),
        )
        .expect_err("cascade");
    assert_eq!(err.class(), ErrorClass::Unsupported);

    assert!(table(&executor, "parent").primary_index.interleaved_by.is_empty());
}

#[test]
fn secondary_indexes_and_storing_columns() {
    let (executor, session) = setup();
    executor
        .execute(
            &session,
            &create_table(
                "t",
                vec![
                    pk("a"),
                    col("b"),
                    col("c"),
                    TableDef::Index(
                        IndexTableDef::index(None, vec![IndexElem::desc("b")]).storing(&["c"]),
                    ),
                    TableDef::Index(IndexTableDef::unique(Some("t_c"), vec![IndexElem::asc("c")])),
                ],
            ),
        )
        .expect("create");
    let t = table(&executor, "t");
    assert_eq!(t.indexes[0].name, "t_b_idx");
    assert_eq!(t.indexes[0].column_directions, vec![IndexDirection::Desc]);
    assert_eq!(t.indexes[0].store_column_names, vec!["c"]);
    assert_eq!(t.indexes[0].extra_column_ids, t.primary_index.column_ids);
    assert_eq!(t.indexes[1].name, "t_c");
    assert!(t.indexes[1].unique);

    let err = executor
        .execute(
            &session,
            &create_table(
                "u",
                vec![
                    pk("a"),
                    TableDef::Index(IndexTableDef::index(None, vec![IndexElem::asc("a")]).storing(&["zz"])),
                ],
            ),
        )
        .expect_err("unknown stored column");
    assert_eq!(err.class(), ErrorClass::InvalidArgument);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn rowid_synthesized_for_any_keyless_table(
        names in proptest::collection::btree_set("[a-q][a-z0-9_]{0,6}", 1..6),
        kinds in proptest::collection::vec(
            prop_oneof![Just(ColumnKind::Int), Just(ColumnKind::String), Just(ColumnKind::Bool)],
            6,
        ),
    ) {
        let (executor, session) = setup();
        let defs = names
            .iter()
            .zip(&kinds)
            .map(|(name, kind)| TableDef::Column(ColumnTableDef::new(name, ColumnType::new(*kind))))
            .collect();
        executor.execute(&session, &create_table("t", defs)).expect("create");

        let t = table(&executor, "t");
        let hidden: Vec<_> = t.columns.iter().filter(|c| c.hidden).collect();
        prop_assert_eq!(hidden.len(), 1);
        prop_assert_eq!(hidden[0].name.as_str(), "rowid");
        prop_assert_eq!(hidden[0].col_type.kind, ColumnKind::Int);
        prop_assert!(!hidden[0].nullable);
        prop_assert_eq!(&t.primary_index.column_ids, &vec![hidden[0].id]);
        prop_assert!(t.primary_index.unique);
    }

    #[test]
    fn column_checks_match_table_checks(
        exprs in proptest::collection::vec("[a-z]{1,4} > [0-9]{1,3}", 1..4),
    ) {
        let (executor, session) = setup();
        let mut inline = ColumnTableDef::new("a", ColumnType::int()).primary_key();
        for expr in &exprs {
            inline = inline.check(None, expr);
        }
        executor
            .execute(&session, &create_table("inline", vec![TableDef::Column(inline)]))
            .expect("inline checks");

        let mut defs = vec![pk("a")];
        defs.extend(exprs.iter().map(|expr| {
            TableDef::Check(sqlschema::ddl::ast::CheckConstraintTableDef {
                name: None,
                expr: expr.clone(),
            })
        }));
        executor
            .execute(&session, &create_table("table_level", defs))
            .expect("table checks");

        prop_assert_eq!(
            table(&executor, "inline").checks,
            table(&executor, "table_level").checks
        );
    }

    #[test]
    fn interleave_prefixes_sum_to_parent_key(extra in proptest::collection::vec(1usize..3, 1..4)) {
        let (executor, session) = setup();
        let mut pk_len = 0;
        let mut parent: Option<(String, Vec<String>)> = None;
        for (depth, add) in extra.iter().enumerate() {
            pk_len += add;
            let columns: Vec<String> = (0..pk_len).map(|i| format!("k{i}")).collect();
            let mut defs: Vec<TableDef> = columns.iter().map(|c| col(c)).collect();
            defs.push(TableDef::Index(IndexTableDef::primary_key(
                columns.iter().map(|c| IndexElem::asc(c)).collect(),
            )));
            let name = format!("t{depth}");
            let statement = match &parent {
                None => create_table(&name, defs),
                Some((parent_name, parent_columns)) => {
                    let fields: Vec<&str> = parent_columns.iter().map(String::as_str).collect();
                    interleaved_table(&name, defs, parent_name, &fields)
                }
            };
            executor.execute(&session, &statement).expect("create level");

            let t = table(&executor, &name);
            if let Some((parent_name, parent_columns)) = &parent {
                let p = table(&executor, parent_name);
                let chain = &t.primary_index.interleave.ancestors;
                prop_assert_eq!(chain.len(), p.primary_index.interleave.ancestors.len() + 1);
                prop_assert_eq!(
                    t.primary_index.interleave.total_shared_prefix_len() as usize,
                    parent_columns.len()
                );
            }
            parent = Some((name, columns));
        }
    }
}
