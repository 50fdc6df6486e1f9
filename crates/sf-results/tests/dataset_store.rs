use sf_core::EquationId;
use sf_results::*;
use sf_sampler::{
    FailureCounts, GenerationStats, InsufficientSamplesWarning, SamplingStrategy, TrainingDataset,
    TrainingSample,
};
use sf_sim::VariableRange;

fn temp_store(tag: &str) -> DatasetStore {
    let dir = std::env::temp_dir().join(format!("sf_results_{}_{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    DatasetStore::new(dir).unwrap()
}

fn dataset(id: u32, samples: usize) -> TrainingDataset {
    TrainingDataset {
        equation_id: EquationId::new(id),
        using_vars: vec!["s".to_string(), "r".to_string()],
        iteration_variables: vec!["y".to_string()],
        ranges: vec![
            VariableRange {
                name: "s".to_string(),
                min: -0.01,
                max: 0.01,
                observed_min: 0.0,
                observed_max: 0.0,
            },
            VariableRange {
                name: "r".to_string(),
                min: 0.99,
                max: 2.02,
                observed_min: 1.0,
                observed_max: 2.0,
            },
        ],
        samples: (0..samples)
            .map(|i| TrainingSample {
                inputs: vec![0.001 * i as f64, 1.0 + 0.1 * i as f64],
                outputs: vec![(i as f64).sqrt()],
            })
            .collect(),
        stats: GenerationStats {
            requested: 4,
            attempts: 9,
            failures: FailureCounts {
                not_converged: 5,
                ..FailureCounts::default()
            },
            eval_seconds: 0.25,
            elapsed_seconds: 0.5,
        },
        warning: (samples < 4).then_some(InsufficientSamplesWarning {
            requested: 4,
            collected: samples,
            attempts: 9,
        }),
        seed: 1234,
        strategy: SamplingStrategy::LatinHypercube,
        cancelled: false,
    }
}

#[test]
fn save_and_load_dataset() {
    let store = temp_store("roundtrip");
    let original = dataset(14, 4);

    let manifest = store.save(&original, "abc123").unwrap();
    assert!(store.has_dataset(EquationId::new(14)));
    assert_eq!(manifest.columns(), vec!["s", "r", "y"]);

    let loaded_manifest = store.load_manifest(EquationId::new(14)).unwrap();
    assert_eq!(loaded_manifest.fingerprint, "abc123");
    assert_eq!(loaded_manifest.collected, 4);
    assert_eq!(loaded_manifest.failures.not_converged, 5);
    assert!(chrono::DateTime::parse_from_rfc3339(&loaded_manifest.created_at).is_ok());

    let loaded = store.load_dataset(EquationId::new(14)).unwrap();
    assert_eq!(loaded.samples, original.samples);
    assert_eq!(loaded.ranges, original.ranges);
    assert_eq!(loaded.strategy, SamplingStrategy::LatinHypercube);

    let csv = std::fs::read_to_string(store.dataset_dir(EquationId::new(14)).join("samples.csv")).unwrap();
    assert!(csv.starts_with("s,r,y\n"));
}

#[test]
fn manifest_uses_camel_case_keys() {
    let store = temp_store("keys");
    store.save(&dataset(7, 2), "f").unwrap();
    let text = std::fs::read_to_string(store.dataset_dir(EquationId::new(7)).join("manifest.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["equationId"], 7);
    assert_eq!(json["usingVars"][1], "r");
    assert_eq!(json["iterationVariables"][0], "y");
    assert_eq!(json["warning"]["collected"], 2);
}

#[test]
fn reuse_requires_matching_fingerprint() {
    let store = temp_store("reuse");
    store.save(&dataset(14, 4), "same").unwrap();
    assert!(store.reusable(EquationId::new(14), "same").is_some());
    assert!(store.reusable(EquationId::new(14), "other").is_none());
    assert!(store.reusable(EquationId::new(15), "same").is_none());

    let mut cancelled = dataset(15, 1);
    cancelled.cancelled = true;
    store.save(&cancelled, "same").unwrap();
    assert!(store.reusable(EquationId::new(15), "same").is_none());
}

#[test]
fn list_is_ordered_by_id() {
    let store = temp_store("list");
    store.save(&dataset(20, 4), "a").unwrap();
    store.save(&dataset(3, 4), "b").unwrap();
    std::fs::create_dir_all(store.root_dir().join("not_a_dataset")).unwrap();

    let ids: Vec<u32> = store.list().unwrap().iter().map(|m| m.equation_id.get()).collect();
    assert_eq!(ids, vec![3, 20]);

    store.delete_dataset(EquationId::new(3)).unwrap();
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn truncated_samples_are_corrupt() {
    let store = temp_store("corrupt");
    store.save(&dataset(14, 4), "x").unwrap();
    let path = store.dataset_dir(EquationId::new(14)).join("samples.csv");
    std::fs::write(&path, "s,r,y\n0,1,0\n").unwrap();
    let err = store.load_dataset(EquationId::new(14)).unwrap_err();
    assert!(matches!(err, ResultsError::Corrupt { .. }));
}

#[test]
fn missing_dataset() {
    let store = temp_store("missing");
    assert!(matches!(
        store.load_manifest(EquationId::new(1)),
        Err(ResultsError::DatasetNotFound { .. })
    ));
}
