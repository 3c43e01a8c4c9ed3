//! Decision-tree training driver
//!
//! Fits the shared encoders on the raw survey, encodes it, optionally runs
//! stratified cross-validation and finally fits one tree on every row.

use std::fs;
use std::path::Path;

use advisor_core::{
    ArtifactBundle, ArtifactManifest, ArtifactPaths, ClassifierModel, EncoderState, TrainingMetadata,
};
use tracing::info;

use crate::cart::{CartBuilder, TreeConfig};
use crate::dataset::SurveyDataset;
use crate::errors::TrainerError;
use crate::evaluation::{accuracy, cross_validate, ClassificationReport, ConfusionMatrix, CrossValidation};

/// Training configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrainingParams {
    pub tree: TreeConfig,
    /// Number of stratified folds; `None` skips cross-validation
    pub folds: Option<usize>,
    /// Seed for fold shuffling and the split tie-breaker
    pub seed: i64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            tree: TreeConfig::default(),
            folds: Some(5),
            seed: 42,
        }
    }
}

/// Cross-validation results with their derived diagnostics
#[derive(Clone, Debug)]
pub struct Evaluation {
    pub cross_validation: CrossValidation,
    pub confusion: ConfusionMatrix,
    pub report: ClassificationReport,
}

/// Everything produced by one training run
#[derive(Clone, Debug)]
pub struct TrainingOutcome {
    pub bundle: ArtifactBundle,
    pub training_accuracy: f64,
    pub sample_count: usize,
    pub evaluation: Option<Evaluation>,
}

impl TrainingOutcome {
    /// Persist model, encoders, manifest and the tree dump into `dir`
    pub fn save(&self, dir: &Path, trained_at: i64) -> Result<ArtifactManifest, TrainerError> {
        let paths = ArtifactPaths::in_dir(dir);
        let manifest = self.bundle.save(
            &paths,
            TrainingMetadata {
                trained_at,
                sample_count: self.sample_count,
                training_accuracy: self.training_accuracy,
            },
        )?;

        fs::write(&paths.tree, self.tree_text()).map_err(|source| TrainerError::Io {
            path: paths.tree.clone(),
            source,
        })?;

        Ok(manifest)
    }

    /// Plain-text rendering of the fitted tree with column and product names
    pub fn tree_text(&self) -> String {
        let encoders = self.bundle.encoders();
        self.bundle
            .model()
            .tree
            .export_text(encoders.feature_names(), encoders.labels().classes())
    }
}

/// Decision-tree trainer
pub struct ModelTrainer {
    params: TrainingParams,
}

impl ModelTrainer {
    pub fn new(params: TrainingParams) -> Self {
        Self { params }
    }

    /// Train a classifier on the given dataset
    pub fn train(&self, dataset: &SurveyDataset) -> Result<TrainingOutcome, TrainerError> {
        let tree_config = TreeConfig {
            seed: self.params.seed,
            ..self.params.tree.clone()
        };

        let encoders = EncoderState::fit(
            dataset.feature_names.clone(),
            dataset.label_name.clone(),
            &dataset.rows,
            &dataset.labels,
        )?;
        let features = encoders.encode_rows(&dataset.rows)?;
        let labels = encoders.encode_labels(&dataset.labels)?;
        let class_count = encoders.class_count();

        info!(
            "Encoded {} samples: {} features, {} classes",
            features.len(),
            encoders.feature_count(),
            class_count
        );

        let evaluation = match self.params.folds {
            Some(folds) => {
                info!("Running stratified {}-fold cross-validation (seed {})", folds, self.params.seed);
                let cross_validation =
                    cross_validate(&features, &labels, class_count, folds, self.params.seed, &tree_config)?;
                let confusion = ConfusionMatrix::new(&labels, &cross_validation.predictions, class_count);
                let report = ClassificationReport::new(&confusion, encoders.labels().classes());
                Some(Evaluation {
                    cross_validation,
                    confusion,
                    report,
                })
            }
            None => None,
        };

        let tree = CartBuilder::new(&features, &labels, class_count, tree_config)?.build();
        let model = ClassifierModel::new(tree, encoders.feature_count(), class_count);

        let predictions = model.predict_batch(&features)?;
        let training_accuracy = accuracy(&labels, &predictions);

        info!(
            "Final tree: {} nodes, {} leaves, depth {}",
            model.tree.nodes.len(),
            model.tree.leaf_count(),
            model.tree.depth()
        );

        Ok(TrainingOutcome {
            bundle: ArtifactBundle::new(model, encoders)?,
            training_accuracy,
            sample_count: dataset.len(),
            evaluation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::{Record, UnknownCategoryPolicy};
    use tempfile::tempdir;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn create_simple_dataset() -> SurveyDataset {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for _ in 0..3 {
            rows.push(strings(&["Doméstico", "127V"]));
            labels.push("Caseiro".to_string());
            rows.push(strings(&["Comercial", "220V"]));
            labels.push("Açougue".to_string());
            rows.push(strings(&["Industrial", "Trifásico"]));
            labels.push("Indústria".to_string());
        }
        SurveyDataset {
            feature_names: strings(&["finalidade", "voltagem"]),
            label_name: "Produto".to_string(),
            rows,
            labels,
        }
    }

    #[test]
    fn test_train_simple_model() {
        let dataset = create_simple_dataset();
        let outcome = ModelTrainer::new(TrainingParams::default()).train(&dataset).unwrap();

        assert_eq!(outcome.sample_count, 9);
        assert_eq!(outcome.training_accuracy, 1.0);
        assert_eq!(outcome.bundle.model().class_count, 3);

        let evaluation = outcome.evaluation.as_ref().unwrap();
        assert_eq!(evaluation.cross_validation.fold_accuracies.len(), 5);
        assert_eq!(evaluation.confusion.total(), 9);

        let record = Record::new().with("finalidade", "Comercial").with("voltagem", "220V");
        let prediction = outcome.bundle.predict(&record, UnknownCategoryPolicy::Reject).unwrap();
        assert_eq!(prediction.label, "Açougue");
    }

    #[test]
    fn test_no_cross_validation() {
        let params = TrainingParams {
            folds: None,
            ..TrainingParams::default()
        };
        let outcome = ModelTrainer::new(params).train(&create_simple_dataset()).unwrap();
        assert!(outcome.evaluation.is_none());
    }

    #[test]
    fn test_too_many_folds() {
        let params = TrainingParams {
            folds: Some(10),
            ..TrainingParams::default()
        };
        assert!(matches!(
            ModelTrainer::new(params).train(&create_simple_dataset()),
            Err(TrainerError::Config(_))
        ));
    }

    #[test]
    fn test_determinism() {
        let dataset = create_simple_dataset();
        let a = ModelTrainer::new(TrainingParams::default()).train(&dataset).unwrap();
        let b = ModelTrainer::new(TrainingParams::default()).train(&dataset).unwrap();

        assert_eq!(
            a.bundle.model().to_canonical_json().unwrap(),
            b.bundle.model().to_canonical_json().unwrap()
        );
        assert_eq!(
            a.evaluation.unwrap().cross_validation,
            b.evaluation.unwrap().cross_validation
        );
    }

    #[test]
    fn test_save_writes_all_artifacts() {
        let dir = tempdir().unwrap();
        let outcome = ModelTrainer::new(TrainingParams::default())
            .train(&create_simple_dataset())
            .unwrap();

        let manifest = outcome.save(dir.path(), 1_700_000_000).unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());

        assert_eq!(manifest.sample_count, 9);
        assert_eq!(manifest.trained_at, 1_700_000_000);
        assert!(paths.exists());

        let tree = fs::read_to_string(&paths.tree).unwrap();
        assert!(tree.contains("class: Indústria"));
        assert_eq!(ArtifactBundle::load(&paths).unwrap(), outcome.bundle);
    }
}
