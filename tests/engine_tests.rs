// Engine tests
// Statements end to end: catalog, planner, result cache and invalidation.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use table_engine::{
    Connective, Create, Delete, Engine, EngineConfig, Error, IndexKind, Insert, Operator, Output,
    Predicate, Select, Update,
};

fn users(engine: &Engine) {
    engine
        .create(Create::new("users", ["id", "name", "age", "city"]))
        .unwrap();
    engine.insert(Insert::new("users", ["1", "John", "25", "London"])).unwrap();
    engine.insert(Insert::new("users", ["2", "Mary", "30", "London"])).unwrap();
    engine.insert(Insert::new("users", ["3", "Bob", "35", "Paris"])).unwrap();
}

fn london_and_young() -> Vec<Predicate> {
    vec![
        Predicate::new("city", Operator::Eq, "London").then(Connective::And),
        Predicate::new("age", Operator::Lt, "30"),
    ]
}

// =============================================================================
// Test 1: Create, insert, select everything
// =============================================================================
#[test]
fn test_select_all() {
    let engine = Engine::default();
    users(&engine);

    let rs = engine.select(Select::all("users")).unwrap();

    assert_eq!(rs.columns, vec!["id", "name", "age", "city"]);
    assert_eq!(rs.len(), 3);
    assert_eq!(rs.column("name"), vec!["John", "Mary", "Bob"]);
}

// =============================================================================
// Test 2: AND / OR end to end, on both index backends
// =============================================================================
#[test]
fn test_and_or_queries() {
    for kind in [IndexKind::BPlusTree, IndexKind::Lsm] {
        let engine = Engine::new(
            EngineConfig::default()
                .with_index_kind(kind)
                .with_btree_order(3)
                .with_memtable_limit(2),
        )
        .unwrap();
        users(&engine);

        let and = engine.select(Select::new("users", london_and_young())).unwrap();
        assert_eq!(and.column("id"), vec!["1"], "{kind:?}");

        let or = engine
            .select(Select::new(
                "users",
                vec![
                    Predicate::new("city", Operator::Eq, "London").then(Connective::Or),
                    Predicate::new("age", Operator::Ge, "30"),
                ],
            ))
            .unwrap();
        assert_eq!(or.column("id"), vec!["1", "2", "3"], "{kind:?}");
    }
}

// =============================================================================
// Test 3: Repeated select is served from the cache
// =============================================================================
#[test]
fn test_repeated_select_hits_cache() {
    let engine = Engine::default();
    users(&engine);

    let first = engine.select(Select::new("users", london_and_young())).unwrap();
    let second = engine.select(Select::new("users", london_and_young())).unwrap();

    assert_eq!(first, second);
    let stats = engine.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(engine.cached_queries(), 1);
}

// =============================================================================
// Test 4: Update invalidates the cache and changes the answer
// =============================================================================
#[test]
fn test_update_invalidates_cache() {
    let engine = Engine::default();
    users(&engine);

    let before = engine.select(Select::new("users", london_and_young())).unwrap();
    assert_eq!(before.column("name"), vec!["John"]);

    let updated = engine
        .update(Update::new(
            "users",
            "age",
            "20",
            vec![Predicate::new("name", Operator::Eq, "Mary")],
        ))
        .unwrap();
    assert_eq!(updated, 1);
    assert_eq!(engine.cached_queries(), 0);

    let after = engine.select(Select::new("users", london_and_young())).unwrap();
    assert_eq!(after.column("name"), vec!["John", "Mary"]);
    assert_eq!(engine.cache_stats().hits, 0);
}

// =============================================================================
// Test 5: Insert and delete invalidate too
// =============================================================================
#[test]
fn test_insert_and_delete_invalidate_cache() {
    let engine = Engine::default();
    users(&engine);
    let london = || Select::new("users", vec![Predicate::new("city", Operator::Eq, "London")]);

    assert_eq!(engine.select(london()).unwrap().len(), 2);

    engine.insert(Insert::new("users", ["4", "Eve", "28", "London"])).unwrap();
    assert_eq!(engine.select(london()).unwrap().len(), 3);

    let deleted = engine
        .delete(Delete::new("users", vec![Predicate::new("age", Operator::Lt, "29")]))
        .unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(engine.select(london()).unwrap().column("name"), vec!["Mary"]);
}

// =============================================================================
// Test 6: Update moves the row in the index
// =============================================================================
#[test]
fn test_update_moves_row_between_keys() {
    for kind in [IndexKind::BPlusTree, IndexKind::Lsm] {
        let engine = Engine::new(EngineConfig::default().with_index_kind(kind)).unwrap();
        users(&engine);

        engine
            .update(Update::new(
                "users",
                "city",
                "Paris",
                vec![Predicate::new("id", Operator::Eq, "1")],
            ))
            .unwrap();

        let london = engine
            .select(Select::new("users", vec![Predicate::new("city", Operator::Eq, "London")]))
            .unwrap();
        assert_eq!(london.column("id"), vec!["2"], "{kind:?}");

        let paris = engine
            .select(Select::new("users", vec![Predicate::new("city", Operator::Eq, "Paris")]))
            .unwrap();
        assert_eq!(paris.column("id"), vec!["1", "3"], "{kind:?}");
    }
}

// =============================================================================
// Test 7: Update without WHERE touches every row
// =============================================================================
#[test]
fn test_update_all_rows() {
    let engine = Engine::default();
    users(&engine);

    let n = engine.update(Update::new("users", "city", "Rome", vec![])).unwrap();

    assert_eq!(n, 3);
    let rome = engine
        .select(Select::new("users", vec![Predicate::new("city", Operator::Eq, "Rome")]))
        .unwrap();
    assert_eq!(rome.len(), 3);
}

// =============================================================================
// Test 8: Delete without WHERE empties the table
// =============================================================================
#[test]
fn test_delete_all_rows() {
    let engine = Engine::default();
    users(&engine);

    assert_eq!(engine.delete(Delete::new("users", vec![])).unwrap(), 3);
    assert!(engine.select(Select::all("users")).unwrap().is_empty());
    assert_eq!(engine.vacuum("users").unwrap(), 3);
}

// =============================================================================
// Test 9: Delete past the threshold vacuums automatically
// =============================================================================
#[test]
fn test_delete_triggers_vacuum() {
    let engine = Engine::new(EngineConfig::default().with_vacuum_threshold(2)).unwrap();
    users(&engine);

    engine
        .delete(Delete::new("users", vec![Predicate::new("id", Operator::Eq, "1")]))
        .unwrap();
    engine
        .delete(Delete::new("users", vec![Predicate::new("id", Operator::Eq, "2")]))
        .unwrap();

    // Already reclaimed
    assert_eq!(engine.vacuum("users").unwrap(), 0);
    assert_eq!(engine.select(Select::all("users")).unwrap().column("id"), vec!["3"]);
}

// =============================================================================
// Test 10: Schema errors
// =============================================================================
#[test]
fn test_schema_errors() {
    let engine = Engine::default();
    users(&engine);

    assert_eq!(
        engine.create(Create::new("users", ["a"])).unwrap_err(),
        Error::TableExists("users".into())
    );
    assert_eq!(
        engine.select(Select::all("orders")).unwrap_err(),
        Error::TableNotFound("orders".into())
    );
    assert_eq!(
        engine.insert(Insert::new("users", ["5", "Zed"])).unwrap_err(),
        Error::ColumnCountMismatch { expected: 4, actual: 2 }
    );
    assert!(matches!(
        engine
            .select(Select::new("users", vec![Predicate::new("salary", Operator::Gt, "1")]))
            .unwrap_err(),
        Error::ColumnNotFound { .. }
    ));
    assert!(matches!(
        engine.update(Update::new("users", "salary", "1", vec![])).unwrap_err(),
        Error::ColumnNotFound { .. }
    ));
    assert_eq!(
        engine.delete(Delete::new("orders", vec![])).unwrap_err(),
        Error::TableNotFound("orders".into())
    );

    // Failed statements change nothing
    assert_eq!(engine.select(Select::all("users")).unwrap().len(), 3);
}

// =============================================================================
// Test 11: More than two predicates are rejected
// =============================================================================
#[test]
fn test_too_many_predicates() {
    let engine = Engine::default();
    users(&engine);

    let preds = vec![
        Predicate::new("id", Operator::Eq, "1").then(Connective::Or),
        Predicate::new("id", Operator::Eq, "2").then(Connective::Or),
        Predicate::new("id", Operator::Eq, "3"),
    ];
    assert_eq!(
        engine.select(Select::new("users", preds)).unwrap_err(),
        Error::TooManyPredicates(3)
    );
}

// =============================================================================
// Test 12: Pruned query returns nothing and skips the cache
// =============================================================================
#[test]
fn test_bloom_pruned_select() {
    let engine = Engine::default();
    users(&engine);

    let rs = engine
        .select(Select::new("users", vec![Predicate::new("city", Operator::Eq, "Tokyo")]))
        .unwrap();

    assert!(rs.is_empty());
    assert_eq!(engine.cached_queries(), 0);
    assert_eq!(engine.cache_stats().misses, 0);
}

// =============================================================================
// Test 13: Cache entries expire after the TTL
// =============================================================================
#[test]
fn test_cache_ttl() {
    let config = EngineConfig::default().with_cache(16, Duration::from_millis(50));
    let engine = Engine::new(config).unwrap();
    users(&engine);
    let q = || Select::new("users", london_and_young());

    engine.select(q()).unwrap();
    thread::sleep(Duration::from_millis(120));
    engine.select(q()).unwrap();

    let stats = engine.cache_stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 2);
}

// =============================================================================
// Test 14: Cache disabled
// =============================================================================
#[test]
fn test_cache_disabled() {
    let engine = Engine::new(EngineConfig::default().with_cache(0, Duration::from_secs(1))).unwrap();
    users(&engine);

    let a = engine.select(Select::new("users", london_and_young())).unwrap();
    let b = engine.select(Select::new("users", london_and_young())).unwrap();

    assert_eq!(a, b);
    assert_eq!(engine.cache_stats().hits, 0);
    assert_eq!(engine.cached_queries(), 0);
}

// =============================================================================
// Test 15: Execute dispatch and output formatting
// =============================================================================
#[test]
fn test_execute_outputs() {
    let engine = Engine::default();

    let created = engine.execute(Create::new("t", ["k", "v"])).unwrap();
    assert_eq!(created.to_string(), "Table t created");

    let inserted = engine.execute(Insert::new("t", ["a", "1"])).unwrap();
    assert_eq!(inserted, Output::Inserted { table: "t".into(), row: 0 });
    engine.execute(Insert::new("t", ["b", "2"])).unwrap();

    let Output::Rows(rs) = engine.execute(Select::all("t")).unwrap() else {
        panic!("select should return rows");
    };
    assert_eq!(rs.to_string(), "k\tv\na\t1\nb\t2\n");

    let updated = engine.execute(Update::new("t", "v", "9", vec![])).unwrap();
    assert_eq!(updated.to_string(), "Table t updated. 2 rows affected.");

    let deleted = engine
        .execute(Delete::new("t", vec![Predicate::new("k", Operator::Eq, "a")]))
        .unwrap();
    assert_eq!(deleted.to_string(), "Rows deleted from t. 1 rows affected.");
}

// =============================================================================
// Test 16: Catalog accessors
// =============================================================================
#[test]
fn test_catalog() {
    let engine = Engine::default();
    engine.create(Create::new("b", ["x"])).unwrap();
    engine.create(Create::new("a", ["y", "z"]).indexed(["z"])).unwrap();

    assert_eq!(engine.table_names(), vec!["a", "b"]);
    assert_eq!(engine.columns("a").unwrap(), vec!["y", "z"]);
    assert!(engine.table_exists("b"));
    assert!(!engine.table_exists("c"));
    assert!(engine.columns("c").is_err());
}

// =============================================================================
// Test 17: Invalid config is rejected
// =============================================================================
#[test]
fn test_invalid_config() {
    let err = Engine::new(EngineConfig::default().with_btree_order(2)).err();
    assert!(matches!(err, Some(Error::InvalidConfig(_))));
}

// =============================================================================
// Test 18: Concurrent readers and writers
// =============================================================================
#[test]
fn test_concurrent_access() {
    let engine = Arc::new(Engine::default());
    engine
        .create(Create::new("events", ["id", "kind"]))
        .unwrap();
    engine.create(Create::new("scores", ["player", "score"])).unwrap();
    for i in 0..100 {
        let player = format!("p{i}");
        let score = i.to_string();
        engine
            .insert(Insert::new("scores", [player.as_str(), score.as_str()]))
            .unwrap();
    }

    // Writers and readers start together so selects overlap each other
    let barrier = Arc::new(Barrier::new(8));
    let mut handles = vec![];
    for t in 0..4 {
        let e = Arc::clone(&engine);
        let b = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            b.wait();
            for i in 0..50 {
                let id = (t * 50 + i).to_string();
                let kind = if i % 2 == 0 { "even" } else { "odd" };
                e.insert(Insert::new("events", [id.as_str(), kind])).unwrap();
                let _ = e
                    .select(Select::new(
                        "events",
                        vec![Predicate::new("kind", Operator::Eq, "even")],
                    ))
                    .unwrap();
            }
        }));
    }
    for t in 0..4 {
        let e = Arc::clone(&engine);
        let b = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            b.wait();
            for i in 0..50 {
                // Distinct bounds per thread: most selects miss the cache
                let bound = ((t * 50 + i) % 100).to_string();
                let below = e
                    .select(Select::new(
                        "scores",
                        vec![Predicate::new("score", Operator::Lt, bound.as_str())],
                    ))
                    .unwrap();
                assert_eq!(below.len(), (t * 50 + i) % 100);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    // Whatever was cached mid-flight, the final answer reflects every insert
    let even = engine
        .select(Select::new("events", vec![Predicate::new("kind", Operator::Eq, "even")]))
        .unwrap();
    assert_eq!(even.len(), 100);
    assert_eq!(engine.select(Select::all("events")).unwrap().len(), 200);
}

// =============================================================================
// Test 19: Range select, cached repeat, update recomputes
// =============================================================================
#[test]
fn test_end_to_end_scenario() {
    let engine = Engine::default();
    users(&engine);
    let q = || Select::new("users", vec![Predicate::new("age", Operator::Ge, "30")]);

    let first = engine.select(q()).unwrap();
    assert_eq!(first.column("id"), vec!["2", "3"]);

    let second = engine.select(q()).unwrap();
    assert_eq!(second, first);
    assert_eq!(engine.cache_stats().hits, 1);

    engine
        .update(Update::new(
            "users",
            "age",
            "31",
            vec![Predicate::new("id", Operator::Eq, "1")],
        ))
        .unwrap();

    let third = engine.select(q()).unwrap();
    assert_eq!(third.column("id"), vec!["1", "2", "3"]);
    assert_eq!(engine.cache_stats().hits, 1);
}
