//! Search workflow: import, rank, explain, replace, warm.

use serde_json::Value;

use super::fixture::{E2EFixture, item_names};

#[test]
fn test_search_workflow() {
    let mut fixture = E2EFixture::new("search_workflow");

    fixture.log_step("Import the sample catalog");
    let report = fixture.import_sample_catalog();
    assert_eq!(report["data"]["imported"], 7);
    assert_eq!(report["data"]["with_embedding"], 6);
    fixture.checkpoint("post-import");

    fixture.log_step("Hybrid search ranks chairs first");
    let json = fixture.run_json(&["search", "chair"]);
    let names = item_names(&json);
    assert!(names[0].contains("Chair"), "got {names:?}");
    assert_eq!(json["data"]["total"], 7);

    fixture.log_step("Explain shows both signals");
    let explained = fixture.run_json(&["search", "chair", "--explain"]);
    let data = &explained["data"];
    assert_eq!(data["lexical"]["state"], "results");
    assert_eq!(data["visual"]["state"], "results");
    let results = data["results"].as_array().expect("results array");
    assert!(!results.is_empty());
    let scores: Vec<f64> = results
        .iter()
        .filter_map(|hit| hit["score"].as_f64())
        .collect();
    assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]), "{scores:?}");

    fixture.log_step("Human output lists the results");
    let output = fixture.run_invs(&["-O", "plain", "search", "sofa"]);
    fixture.assert_success(&output, "plain search");
    fixture.assert_output_contains(&output, "Blue Velvet Sofa");

    fixture.log_step("Warm the embedding cache");
    let warm = fixture.run_json(&["warm"]);
    assert_eq!(warm["data"]["entries"], 6);

    fixture.log_step("Replace the catalog");
    let replacement = fixture.root.join("replacement.jsonl");
    std::fs::write(
        &replacement,
        "{\"name\": \"Pink Neon Sign\", \"category\": \"Signs\"}\n\
         {\"name\": \"Copper Lantern\", \"category\": \"Lighting\"}\n",
    )
    .expect("write replacement");
    let replacement = replacement.to_string_lossy().to_string();
    let report = fixture.run_json(&["import", "--replace", &replacement]);
    assert_eq!(report["data"]["replaced"], 7);
    assert_eq!(report["data"]["imported"], 2);
    fixture.checkpoint("post-replace");

    fixture.log_step("Old items are gone and the cache is empty");
    let json = fixture.run_json(&["search", "chair"]);
    assert!(
        !item_names(&json).iter().any(|name| name.contains("Chair")),
        "stale results: {json}"
    );
    let warm = fixture.run_json(&["warm"]);
    assert_eq!(warm["data"]["entries"], 0);

    fixture.log_step("Synonyms reach the new items");
    let json = fixture.run_json(&["search", "lighting", "--visual-weight", "0"]);
    let names = item_names(&json);
    assert!(names.contains(&"Copper Lantern".to_string()), "got {names:?}");

    fixture.generate_report();
}

#[test]
fn test_search_lexical_only_workflow() {
    let mut fixture = E2EFixture::new("search_lexical_only");
    fixture.set_env("INVS_EMBEDDING_BACKEND", "none");

    fixture.log_step("Import with the provider disabled");
    let report = fixture.import_sample_catalog();
    assert_eq!(report["data"]["computed_embeddings"], 0);

    fixture.log_step("Explain reports the visual signal as unavailable");
    let json = fixture.run_json(&["search", "table", "--explain"]);
    assert_eq!(json["data"]["visual"]["state"], "unavailable");
    assert_eq!(json["data"]["weights"]["visual"], 0.0);
    let names: Vec<&str> = json["data"]["results"]
        .as_array()
        .expect("results")
        .iter()
        .filter_map(|hit| hit["name"].as_str())
        .collect();
    assert!(names.contains(&"Banquet Table"));
    assert!(names.contains(&"Round Cocktail Table"));

    fixture.log_step("Embedding command fails with a structured error");
    let output = fixture.run_invs(&["--robot", "embed", "chair"]);
    assert!(!output.success);
    let error: Value = output.json();
    assert_eq!(error["status"]["error"]["code"], "EMBEDDING_UNAVAILABLE");

    fixture.generate_report();
}
