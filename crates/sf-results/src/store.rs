//! Dataset storage API.
//!
//! Layout under the output directory:
//! - `eq_<id>/samples.csv`
//! - `eq_<id>/manifest.json` (written last; its presence marks a complete artifact)
//! - `report.json`

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use sf_core::EquationId;
use sf_sampler::{GenerationStats, TrainingDataset};

use crate::csv::{read_samples, write_samples};
use crate::manifest::DatasetManifest;
use crate::{ResultsError, ResultsResult};

const MANIFEST_FILE: &str = "manifest.json";
const SAMPLES_FILE: &str = "samples.csv";
const REPORT_FILE: &str = "report.json";

#[derive(Clone, Debug)]
pub struct DatasetStore {
    root_dir: PathBuf,
}

impl DatasetStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn dataset_dir(&self, id: EquationId) -> PathBuf {
        self.root_dir.join(id.artifact_name())
    }

    pub fn has_dataset(&self, id: EquationId) -> bool {
        self.dataset_dir(id).join(MANIFEST_FILE).exists()
    }

    /// Persist `dataset`; returns the manifest written.
    pub fn save(&self, dataset: &TrainingDataset, fingerprint: &str) -> ResultsResult<DatasetManifest> {
        let dir = self.dataset_dir(dataset.equation_id);
        fs::create_dir_all(&dir)?;

        // An existing manifest would vouch for samples about to be replaced.
        let manifest_path = dir.join(MANIFEST_FILE);
        if manifest_path.exists() {
            fs::remove_file(&manifest_path)?;
        }

        fs::write(
            dir.join(SAMPLES_FILE),
            write_samples(dataset.columns(), &dataset.samples),
        )?;

        let manifest = DatasetManifest::from_dataset(dataset, fingerprint);
        fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

        tracing::debug!(
            equation = %dataset.equation_id,
            samples = dataset.samples.len(),
            dir = %dir.display(),
            "dataset saved"
        );
        Ok(manifest)
    }

    pub fn load_manifest(&self, id: EquationId) -> ResultsResult<DatasetManifest> {
        let manifest_path = self.dataset_dir(id).join(MANIFEST_FILE);

        if !manifest_path.exists() {
            return Err(ResultsError::DatasetNotFound {
                id: id.artifact_name(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        let manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    /// Manifest of a stored dataset matching `fingerprint`, if any.
    pub fn reusable(&self, id: EquationId, fingerprint: &str) -> Option<DatasetManifest> {
        if !self.has_dataset(id) {
            return None;
        }
        match self.load_manifest(id) {
            Ok(manifest) if manifest.is_reusable_for(fingerprint) => Some(manifest),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(equation = %id, error = %err, "ignoring unreadable cached manifest");
                None
            }
        }
    }

    pub fn load_dataset(&self, id: EquationId) -> ResultsResult<TrainingDataset> {
        let manifest = self.load_manifest(id)?;
        let samples_path = self.dataset_dir(id).join(SAMPLES_FILE);
        if !samples_path.exists() {
            return Err(ResultsError::DatasetNotFound {
                id: id.artifact_name(),
            });
        }

        let content = fs::read_to_string(samples_path)?;
        let corrupt = |reason: String| ResultsError::Corrupt {
            id: id.artifact_name(),
            reason,
        };
        let (names, samples) = read_samples(&content, manifest.using_vars.len()).map_err(corrupt)?;
        if names != manifest.columns() {
            return Err(corrupt("sample columns do not match manifest".to_string()));
        }
        if samples.len() != manifest.collected {
            return Err(corrupt(format!(
                "manifest lists {} samples, file has {}",
                manifest.collected,
                samples.len()
            )));
        }

        Ok(TrainingDataset {
            equation_id: manifest.equation_id,
            using_vars: manifest.using_vars,
            iteration_variables: manifest.iteration_variables,
            ranges: manifest.ranges,
            samples,
            stats: GenerationStats {
                requested: manifest.requested,
                attempts: manifest.attempts,
                failures: manifest.failures,
                eval_seconds: manifest.eval_seconds,
                elapsed_seconds: 0.0,
            },
            warning: manifest.warning,
            seed: manifest.seed,
            strategy: manifest.strategy,
            cancelled: manifest.cancelled,
        })
    }

    /// Manifests of every stored dataset, ordered by equation id.
    pub fn list(&self) -> ResultsResult<Vec<DatasetManifest>> {
        let mut manifests = Vec::new();

        if !self.root_dir.exists() {
            return Ok(manifests);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if let Ok(id) = name.parse::<EquationId>()
                && let Ok(manifest) = self.load_manifest(id)
            {
                manifests.push(manifest);
            }
        }

        manifests.sort_by_key(|m| m.equation_id);
        Ok(manifests)
    }

    pub fn delete_dataset(&self, id: EquationId) -> ResultsResult<()> {
        let dir = self.dataset_dir(id);
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn report_path(&self) -> PathBuf {
        self.root_dir.join(REPORT_FILE)
    }

    pub fn save_report<R: Serialize>(&self, report: &R) -> ResultsResult<PathBuf> {
        let path = self.report_path();
        fs::write(&path, serde_json::to_string_pretty(report)?)?;
        Ok(path)
    }

    pub fn load_report<R: DeserializeOwned>(&self) -> ResultsResult<R> {
        let path = self.report_path();
        if !path.exists() {
            return Err(ResultsError::DatasetNotFound {
                id: REPORT_FILE.to_string(),
            });
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
