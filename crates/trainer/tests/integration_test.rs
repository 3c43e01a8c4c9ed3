//! Integration tests for the deterministic trainer
//!
//! Trains on the bundled survey and checks that the persisted artifacts
//! are reproducible and predict like the in-memory model.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use advisor_core::{
    ArtifactBundle, ArtifactError, ArtifactPaths, ColumnEncoding, EncodeError, PredictError, Record,
    UnknownCategoryPolicy,
};
use advisor_trainer::{train_model_from_csv, SurveyDataset, TrainingParams, DEFAULT_ID_COLUMN};
use anyhow::Result;
use tempfile::{tempdir, NamedTempFile};

fn survey_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/base-dados-atualizada.csv")
}

fn record_for(dataset: &SurveyDataset, row: usize) -> Record {
    dataset
        .feature_names
        .iter()
        .zip(&dataset.rows[row])
        .fold(Record::new(), |record, (q, a)| record.with(q.as_str(), a.as_str()))
}

#[test]
fn test_deterministic_training() -> Result<()> {
    let first = train_model_from_csv(&survey_path(), Some(DEFAULT_ID_COLUMN), TrainingParams::default())?;
    let second = train_model_from_csv(&survey_path(), Some(DEFAULT_ID_COLUMN), TrainingParams::default())?;

    let dir1 = tempdir()?;
    let dir2 = tempdir()?;
    let manifest1 = first.save(dir1.path(), 1_700_000_000)?;
    let manifest2 = second.save(dir2.path(), 1_700_000_000)?;

    assert_eq!(manifest1, manifest2, "manifests should be identical");
    for file in ["model.json", "encoders.json", "tree.txt"] {
        assert_eq!(
            fs::read(dir1.path().join(file))?,
            fs::read(dir2.path().join(file))?,
            "{file} should be byte-identical"
        );
    }

    let cv1 = &first.evaluation.as_ref().expect("cross-validation ran").cross_validation;
    let cv2 = &second.evaluation.as_ref().expect("cross-validation ran").cross_validation;
    assert_eq!(cv1, cv2);

    Ok(())
}

#[test]
fn test_reloaded_model_reproduces_training_predictions() -> Result<()> {
    let dataset = SurveyDataset::from_csv(survey_path(), Some(DEFAULT_ID_COLUMN))?;
    let outcome = train_model_from_csv(&survey_path(), Some(DEFAULT_ID_COLUMN), TrainingParams::default())?;
    assert_eq!(outcome.training_accuracy, 1.0);

    let dir = tempdir()?;
    outcome.save(dir.path(), 0)?;
    let loaded = ArtifactBundle::load(&ArtifactPaths::in_dir(dir.path()))?;

    for row in 0..dataset.len() {
        let record = record_for(&dataset, row);
        let before = outcome.bundle.predict(&record, UnknownCategoryPolicy::Reject)?;
        let after = loaded.predict(&record, UnknownCategoryPolicy::Reject)?;

        assert_eq!(before, after, "row {row}");
        assert_eq!(after.label, dataset.labels[row], "row {row}");
    }

    Ok(())
}

#[test]
fn test_manifest_contents() -> Result<()> {
    let outcome = train_model_from_csv(&survey_path(), Some(DEFAULT_ID_COLUMN), TrainingParams::default())?;
    let dir = tempdir()?;
    outcome.save(dir.path(), 42)?;

    let manifest: serde_json::Value = serde_json::from_str(&fs::read_to_string(dir.path().join("manifest.json"))?)?;
    assert_eq!(manifest["trained_at"], 42);
    assert_eq!(manifest["sample_count"], 40);
    assert_eq!(manifest["model_hash"], outcome.bundle.model_hash()?);

    Ok(())
}

#[test]
fn test_tampered_model_is_rejected() -> Result<()> {
    let outcome = train_model_from_csv(&survey_path(), Some(DEFAULT_ID_COLUMN), TrainingParams::default())?;
    let dir = tempdir()?;
    let paths = ArtifactPaths::in_dir(dir.path());
    outcome.save(dir.path(), 0)?;

    let model = fs::read_to_string(&paths.model)?;
    fs::write(&paths.model, model.replacen("\"threshold\":", "\"threshold\":1", 1))?;

    assert!(matches!(
        ArtifactBundle::load(&paths),
        Err(ArtifactError::HashMismatch { .. })
    ));

    Ok(())
}

#[test]
fn test_free_text_column_uses_fallback_encoder() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "Perguntas,Marca preferida,Qual é a voltagem que pretende utilizar?,Produto")?;
    for (i, (brand, volt, product)) in [
        ("Walita", "127V", "Compacto"),
        ("Arbel", "220V", "Profissional"),
        ("Walita", "127V", "Compacto"),
        ("Arbel", "220V", "Profissional"),
        ("Bosch", "Sim", "Compacto"),
    ]
    .iter()
    .enumerate()
    {
        writeln!(file, "{},{},{},{}", i + 1, brand, volt, product)?;
    }
    file.flush()?;

    let params = TrainingParams {
        folds: None,
        ..TrainingParams::default()
    };
    let outcome = train_model_from_csv(file.path(), Some(DEFAULT_ID_COLUMN), params)?;
    let bundle = &outcome.bundle;

    // static table wins even in a free-text column; the rest is sorted from 0
    let encode = |brand: &str| {
        let record = Record::new()
            .with("Marca preferida", brand)
            .with("Qual é a voltagem que pretende utilizar?", "127V");
        bundle.encoders().encode_record(&record, UnknownCategoryPolicy::Reject)
    };
    assert_eq!(encode("Arbel")?, vec![0, 1]);
    assert_eq!(encode("Bosch")?, vec![1, 1]);
    assert_eq!(encode("Walita")?, vec![2, 1]);
    assert_eq!(encode("Sim")?, vec![1, 1]);
    assert_eq!(
        encode("Tramontina"),
        Err(EncodeError::UnknownCategory {
            column: "Marca preferida".into(),
            value: "Tramontina".into()
        })
    );

    Ok(())
}

#[test]
fn test_survey_columns_report_unseen_answers_as_unknown() -> Result<()> {
    let dataset = SurveyDataset::from_csv(survey_path(), Some(DEFAULT_ID_COLUMN))?;
    let params = TrainingParams {
        folds: None,
        ..TrainingParams::default()
    };
    let outcome = train_model_from_csv(&survey_path(), Some(DEFAULT_ID_COLUMN), params)?;
    let encoders = outcome.bundle.encoders();

    // every survey answer is in the static table
    assert!(encoders
        .columns()
        .iter()
        .all(|column| matches!(column, ColumnEncoding::Categorical { fallback } if fallback.is_empty())));

    let column = dataset
        .feature_names
        .iter()
        .position(|name| name == "O que irá moer?")
        .expect("survey asks what will be ground");
    let mut record = Record::new();
    for (i, (question, answer)) in dataset.feature_names.iter().zip(&dataset.rows[0]).enumerate() {
        record.push(question.as_str(), if i == column { "Peixe" } else { answer.as_str() });
    }

    assert!(matches!(
        outcome.bundle.predict(&record, UnknownCategoryPolicy::Reject),
        Err(PredictError::Encode(EncodeError::UnknownCategory { value, .. })) if value == "Peixe"
    ));
    let prediction = outcome.bundle.predict(&record, UnknownCategoryPolicy::Sentinel(0))?;
    assert_eq!(prediction.features[column], 0);
    assert!(dataset.labels.contains(&prediction.label));

    Ok(())
}
