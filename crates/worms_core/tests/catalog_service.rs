use rusqlite::Connection;
use worms_core::db::open_db_in_memory;
use worms_core::{
    CatalogRepository, CatalogService, Collection, Filter, Species, SpeciesStatus,
    SqliteCatalogRepository, Update, Value,
};

const NOW: i64 = 1_760_000_000_000;

fn seeded_service(conn: &Connection) -> CatalogService<SqliteCatalogRepository<'_>> {
    let service = CatalogService::new(SqliteCatalogRepository::try_new(conn).unwrap());
    service.seed_demo_at(NOW).unwrap();
    service
}

#[test]
fn species_with_image_skips_cleared_images_and_other_statuses() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn);

    let outcome = service
        .update_one(
            Collection::Species,
            &Filter::new().eq("species_name", "Pocillopora damicornis"),
            &Update::new().set("image", Value::Null),
        )
        .unwrap();
    assert_eq!((outcome.matched, outcome.modified), (1, 1));
    service
        .set_species_status("Montipora digitata", SpeciesStatus::NotAccepted)
        .unwrap();

    let with_image = service.species_with_image(SpeciesStatus::Accepted).unwrap();
    let names: Vec<&str> = with_image.iter().map(|s| s.species_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Goniopora lobata", "Acropora cervicornis", "Stylophora pistillata"]
    );
    assert!(with_image.iter().all(Species::is_accepted));

    let rejected = service
        .species_with_image(SpeciesStatus::NotAccepted)
        .unwrap();
    assert_eq!(rejected.len(), 1);
    assert!(!rejected[0].is_accepted());
}

#[test]
fn status_membership_covers_every_listed_status() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn);

    let outcome = service
        .update_many(
            Collection::Species,
            &Filter::new().is_in(
                "species_name",
                ["Stylophora pistillata", "Montipora digitata"],
            ),
            &Update::new().set("status", "not accepted"),
        )
        .unwrap();
    assert_eq!((outcome.matched, outcome.modified), (2, 2));

    let accepted = service
        .species_with_status_in(&[SpeciesStatus::Accepted])
        .unwrap();
    assert_eq!(accepted.len(), 3);

    let both = service
        .species_with_status_in(&[SpeciesStatus::Accepted, SpeciesStatus::NotAccepted])
        .unwrap();
    assert_eq!(both.len(), 5);

    let none = service
        .species_with_status_in(&[SpeciesStatus::Other("uncertain".to_string())])
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn taxonomy_and_distribution_queries_use_seeded_ranks_and_regions() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn);

    let corals = service
        .taxonomy_in_order("Cnidaria", "Scleractinia")
        .unwrap();
    assert_eq!(corals.len(), 3);
    assert!(corals.iter().all(|entry| entry.class_name == "Anthozoa"));
    assert!(service
        .taxonomy_in_order("Porifera", "Scleractinia")
        .unwrap()
        .is_empty());

    let caribbean = service.distribution_in_region("Caribbean Sea").unwrap();
    assert_eq!(caribbean.len(), 1);
    assert_eq!(caribbean[0].species_name, "Acropora cervicornis");
    assert!(service.distribution_in_region("Red Sea").unwrap().is_empty());

    assert_eq!(
        service
            .repo()
            .count(Collection::Distribution, &Filter::new())
            .unwrap(),
        3
    );
}
