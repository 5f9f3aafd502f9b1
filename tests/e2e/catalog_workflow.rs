//! Catalog workflow: browse, categories, BM25 index.

use super::fixture::{E2EFixture, item_names};

#[test]
fn test_catalog_browse_workflow() {
    let mut fixture = E2EFixture::new("catalog_browse");

    fixture.log_step("Empty catalog browses to nothing");
    let json = fixture.run_json(&["browse"]);
    assert_eq!(json["data"]["total"], 0);

    fixture.log_step("Import and browse alphabetically");
    fixture.import_sample_catalog();
    let json = fixture.run_json(&["browse", "--limit", "3"]);
    assert_eq!(
        item_names(&json),
        vec!["Acrylic Ghost Chair", "Banquet Table", "Blue Velvet Sofa"]
    );

    fixture.log_step("Categories skip blanks");
    let json = fixture.run_json(&["categories"]);
    assert_eq!(json["data"]["count"], 4);

    fixture.log_step("Category filter is exact");
    let json = fixture.run_json(&["category", "Lounge"]);
    assert_eq!(item_names(&json), vec!["Blue Velvet Sofa"]);
    let json = fixture.run_json(&["category", "lounge"]);
    assert!(item_names(&json).is_empty());

    fixture.checkpoint("browsed");
    fixture.generate_report();
}

#[test]
fn test_catalog_bm25_workflow() {
    let mut fixture = E2EFixture::new("catalog_bm25");

    fixture.log_step("Import with the default backend");
    fixture.import_sample_catalog();

    fixture.log_step("Build the BM25 index explicitly");
    let json = fixture.run_json(&["index"]);
    assert_eq!(json["data"]["indexed"], 7);
    assert_eq!(json["data"]["active"], false);
    assert!(fixture.data_root.join("index").exists());

    fixture.log_step("Search through the BM25 backend");
    fixture.set_env("INVS_SEARCH_LEXICAL_BACKEND", "tantivy");
    let json = fixture.run_json(&["search", "cocktail", "--visual-weight", "0"]);
    assert_eq!(item_names(&json)[0], "Round Cocktail Table");

    fixture.checkpoint("indexed");
    fixture.generate_report();
}
