use worms_core::console::{run_script, run_script_with_clock};
use worms_core::db::open_db_in_memory;
use worms_core::{
    CatalogRepository, Collection, ConsoleError, Filter, FindQuery, Species, SpeciesStatus,
    SqliteCatalogRepository, StatementOutput, Taxonomy, DEMO_SCRIPT,
};

fn documents(output: &StatementOutput) -> &[serde_json::Value] {
    match output {
        StatementOutput::Documents { documents, .. } => documents,
        other => panic!("expected documents, got {other:?}"),
    }
}

#[test]
fn demo_script_replays_without_failures() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    let report = run_script(&repo, DEMO_SCRIPT);
    for statement in &report.statements {
        assert!(
            statement.result.is_ok(),
            "line {} failed: {:?}",
            statement.line,
            statement.result
        );
    }
    assert!(!report.aborted);

    let lookup = report
        .statements
        .iter()
        .find(|statement| statement.source.contains(".lookup("))
        .unwrap();
    let rows = documents(lookup.result.as_ref().unwrap());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["species_name"], "Acropora cervicornis");
    assert_eq!(rows[0]["distribution_info"]["region"], "Caribbean Sea");

    let not_accepted: Vec<Species> = repo
        .find(&FindQuery::new(Filter::new().eq("status", "not accepted")))
        .unwrap();
    assert_eq!(not_accepted.len(), 1);
    assert_eq!(not_accepted[0].species_name, "Acropora cervicornis");

    let updated_phylum = repo
        .count(
            Collection::Taxonomy,
            &Filter::new().eq("phylum", "Updated Phylum"),
        )
        .unwrap();
    assert_eq!(updated_phylum, 3);

    let new_order: Vec<Taxonomy> = repo
        .find(&FindQuery::new(Filter::new().eq("order", "New Order")))
        .unwrap();
    assert_eq!(new_order.len(), 1);
    assert_eq!(new_order[0].species_name, "Goniopora lobata");

    let accepted = repo
        .count(Collection::Species, &Filter::new().eq("status", "accepted"))
        .unwrap();
    assert_eq!(accepted, 4);
}

#[test]
fn update_statements_report_counts() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    let script = r#"
species.insertMany([
    {"species_name": "A", "author": "x", "status": "accepted"},
    {"species_name": "B", "author": "x", "status": "accepted"}
])
species.updateMany({"author": "x"}, {"$set": {"status": "not accepted"}})
species.updateOne({"species_name": "Nemo"}, {"$set": {"status": "accepted"}})
species.count({"status": "not accepted"})
"#;
    let report = run_script(&repo, script);
    assert_eq!(report.failures(), 0);

    let outputs: Vec<_> = report
        .statements
        .iter()
        .map(|statement| statement.result.as_ref().unwrap().clone())
        .collect();
    assert!(matches!(&outputs[0], StatementOutput::Inserted { ids, .. } if ids.len() == 2));
    assert!(matches!(
        &outputs[1],
        StatementOutput::Updated { outcome, .. } if outcome.matched == 2 && outcome.modified == 2
    ));
    assert!(matches!(
        &outputs[2],
        StatementOutput::Updated { outcome, .. } if outcome.is_not_found()
    ));
    assert_eq!(
        outputs[3],
        StatementOutput::Count {
            collection: "species",
            count: 2
        }
    );
}

#[test]
fn trailing_comments_and_shared_lines_keep_every_write() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    let script = r#"
species.insertOne({"species_name": "A", "author": "x", "status": "accepted"}); // seed one
species.insertOne({"species_name": "B", "author": "x", "status": "accepted"}); species.count()
"#;
    let report = run_script(&repo, script);
    assert_eq!(report.failures(), 0);
    assert_eq!(report.statements.len(), 3);
    assert_eq!(
        report.statements[2].result.as_ref().unwrap(),
        &StatementOutput::Count {
            collection: "species",
            count: 2
        }
    );
    assert_eq!(repo.count(Collection::Species, &Filter::new()).unwrap(), 2);
}

#[test]
fn malformed_statements_are_reported_and_skipped() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    let script = r#"
reefs.find({})
species.find({"status": {"$regex": "acc"}})
species.aggregate([])
taxonomy.lookup("distribution")
species.insertOne({"species_name": "A", "author": "x", "status": "accepted"})
"#;
    let report = run_script(&repo, script);
    assert!(!report.aborted);
    assert_eq!(report.statements.len(), 5);
    assert_eq!(report.failures(), 4);

    assert!(matches!(
        report.statements[0].result,
        Err(ConsoleError::UnknownCollection(_))
    ));
    assert!(matches!(
        report.statements[1].result,
        Err(ConsoleError::Malformed(_))
    ));
    assert!(matches!(
        report.statements[2].result,
        Err(ConsoleError::UnknownMethod { .. })
    ));
    assert!(matches!(
        report.statements[3].result,
        Err(ConsoleError::UnknownMethod { .. })
    ));
    assert!(report.statements[4].result.is_ok());
    assert_eq!(repo.count(Collection::Species, &Filter::new()).unwrap(), 1);
}

#[test]
fn store_unavailable_aborts_remaining_statements() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();
    conn.execute_batch("DROP TABLE distribution;").unwrap();

    let script = r#"
species.insertOne({"species_name": "A", "author": "x", "status": "accepted"})
distribution.find({})
species.insertOne({"species_name": "B", "author": "x", "status": "accepted"})
"#;
    let report = run_script(&repo, script);
    assert!(report.aborted);
    assert_eq!(report.statements.len(), 2);
    assert!(report.statements[1]
        .result
        .as_ref()
        .err()
        .map_or(false, ConsoleError::is_fatal));

    let species: Vec<Species> = repo.find(&FindQuery::default()).unwrap();
    assert_eq!(species.len(), 1);
    assert_eq!(species[0].status, SpeciesStatus::Accepted);
}

#[test]
fn relative_dates_use_the_statement_clock() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    let script = r#"
species.insertMany([
    {"species_name": "Old", "author": "x", "status": "accepted", "createdAt": {"$date": 0}},
    {"species_name": "New", "author": "x", "status": "accepted", "createdAt": {"$date": "2025-01-01T00:00:00Z"}}
])
species.find({"updatedAt": {"$gte": {"$ago": "24h"}}})
"#;
    let now = 1_735_689_600_000 + 60_000;
    let report = run_script_with_clock(&repo, script, || now);
    assert_eq!(report.failures(), 0);

    let found = documents(report.statements[1].result.as_ref().unwrap());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["species_name"], "New");
}
