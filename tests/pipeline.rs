//! Full pipeline run over a temporary workspace.

use std::fs;

use glyphstat::config::RunConfig;
use glyphstat::Pipeline;

const TRANSCRIPTION: &str = "\
<f1r.P1.1;H> fachys ykal ar ataiin shol shory
<f1r.P1.2;H> sory ckhar or y kair chtaiin shar are
qokedy qokedy dal qokedy daiin ol
daiin ol chedy qokeey daiin

[?] 12
shedy qokedy chedy ol daiin daiin
";

const TOKEN_COORDS: &str = r#"{"token":"daiin","folio":"1r"}
{"token":"ol","folio":"1r"}
{"token":"chedy","folio":"1v"}
{"token":"daiin","folio":"1v"}
{"token":"qokedy","page":"2r"}
not json
{"token":"shedy","folio":"2v"}
"#;

#[test]
fn test_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let input = root.join("transcription.txt");
    fs::write(&input, TRANSCRIPTION).unwrap();

    let corpora = root.join("corpora");
    fs::create_dir(&corpora).unwrap();
    fs::write(corpora.join("latin.txt"), "arma virumque cano troiae qui primus ab oris\n").unwrap();
    fs::write(corpora.join("echo.txt"), "daiin ol qokedy chedy daiin\nshedy ol\n").unwrap();
    fs::write(corpora.join("empty.txt"), "").unwrap();

    let coords = root.join("token_coords.jsonl");
    fs::write(&coords, TOKEN_COORDS).unwrap();

    let mut config = RunConfig::default();
    config.paths.input = input;
    config.paths.corpora_dir = corpora;
    config.paths.output_dir = root.join("reports");
    config.paths.token_coords = Some(coords);
    config.analysis.parallel = true;

    let summary = Pipeline::run(&config).unwrap();
    assert_eq!(summary.records, 5);
    assert_eq!(summary.corpora_compared, 3);
    assert_eq!(summary.timeline_units, Some(4));
    assert!(summary.artifacts.iter().all(|p| p.is_file()));

    let reports = root.join("reports");
    let metrics: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(reports.join("experiment_metrics.json")).unwrap())
            .unwrap();
    assert_eq!(metrics["lines"], 5);
    assert_eq!(metrics["metadata"]["run_id"], summary.run_id.as_str());

    let csv = fs::read_to_string(reports.join("comparison").join("summary.csv")).unwrap();
    let ranked: Vec<&str> = csv
        .lines()
        .skip(1)
        .map(|l| l.split(',').next().unwrap())
        .collect();
    assert_eq!(ranked[0], "echo");
    assert_eq!(ranked.len(), 3);

    assert!(reports.join("comparison").join("compare_report.json").is_file());
    assert!(reports.join("comparison").join("latin_details.json").is_file());

    let timeline: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(reports.join("timeline").join("timeline.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(timeline["shifts"].as_array().unwrap().len(), 3);
    assert_eq!(timeline["units"][0]["unit"], "1r");
    assert_eq!(timeline["units"][2]["unit"], "2r");

    // a second run reproduces the same rankings
    let again = Pipeline::run(&config).unwrap();
    assert_ne!(again.run_id, summary.run_id);
    let csv_again = fs::read_to_string(reports.join("comparison").join("summary.csv")).unwrap();
    assert_eq!(csv, csv_again);
}

#[test]
fn test_pipeline_without_corpora_or_timeline() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("t.txt");
    fs::write(&input, "daiin ol\nchedy\n").unwrap();

    let mut config = RunConfig::default();
    config.paths.input = input;
    config.paths.corpora_dir = dir.path().join("no_corpora");
    config.paths.output_dir = dir.path().join("out");

    let summary = Pipeline::run(&config).unwrap();
    assert_eq!(summary.corpora_compared, 0);
    assert_eq!(summary.timeline_units, None);
    assert!(!dir.path().join("out").join("comparison").exists());
}
