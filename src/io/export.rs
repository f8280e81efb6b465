//! Export datasets and run results to CSV / JSON.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::{self, File};
use std::path::Path;

use serde::Serialize;

use crate::domain::{
    AgeEffectPoint, CoefficientRow, ComparisonRecord, Dataset, DatasetStats, Level, ModalProfile, ModelFailure,
    ModelKind, RunConfig,
};
use crate::error::AppError;
use crate::fit::ModelComparison;
use crate::io::ingest::COLUMNS;

pub const COMPARISON_FILE: &str = "comparison.csv";
pub const COEFFICIENTS_FILE: &str = "coefficients.csv";
pub const AGE_EFFECT_FILE: &str = "age_effect.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Machine-readable run summary (`summary.json`).
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary<'a> {
    pub tool: &'static str,
    pub config: &'a RunConfig,
    pub dataset: DatasetStats,
    pub complete_cases: DatasetStats,
    pub records: &'a [ComparisonRecord],
    pub failures: &'a [ModelFailure],
    pub best_by_aic: Option<ModelKind>,
    pub best_by_cv: Option<ModelKind>,
    /// Interaction-model coefficients, if that model fit.
    pub coefficients: Option<&'a [CoefficientRow]>,
    pub modal_profile: Option<ModalProfile>,
    pub skipped: &'a [String],
}

/// Create the output directory (and parents). Existing directories are fine.
pub fn ensure_out_dir(dir: &Path) -> Result<(), AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::io(format!("Failed to create output directory '{}': {e}", dir.display())))
}

/// Write a dataset in the ingest schema; missing ages are written as `NA`.
pub fn write_dataset_csv(path: &Path, data: &Dataset) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_out_dir(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::io(format!("Failed to create dataset CSV '{}': {e}", path.display())))?;

    writer
        .write_record(COLUMNS)
        .map_err(|e| AppError::io(format!("Failed to write dataset CSV header: {e}")))?;

    for row in data.rows() {
        let age = row.age.map(|a| a.to_string()).unwrap_or_else(|| "NA".to_string());
        writer
            .write_record([
                if row.outcome { "1" } else { "0" },
                row.race.label(),
                age.as_str(),
                row.gender.label(),
                row.high_crime_area.label(),
                row.violent_crime_reason.label(),
            ])
            .map_err(|e| AppError::io(format!("Failed to write dataset CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush dataset CSV: {e}")))?;
    log::info!("wrote {} rows to {}", data.len(), path.display());
    Ok(())
}

/// One `comparison.csv` line; metrics are empty for a failed model.
#[derive(Debug, Serialize)]
struct ComparisonRow {
    model: ModelKind,
    status: &'static str,
    params: Option<usize>,
    n_rows: usize,
    log_likelihood: Option<f64>,
    aic: Option<f64>,
    pseudo_r2: Option<f64>,
    cv_log_loss: Option<f64>,
    best_by_aic: bool,
    best_by_cv: bool,
    message: Option<String>,
}

/// One row per model; failed models keep their name with empty metrics.
pub fn write_comparison_csv(path: &Path, comparison: &ModelComparison) -> Result<(), AppError> {
    let mut writer = csv_writer(path, "comparison CSV")?;

    for kind in ModelKind::COMPARED {
        let row = if let Some(r) = comparison.record(kind) {
            ComparisonRow {
                model: kind,
                status: "ok",
                params: Some(r.params),
                n_rows: r.n_rows,
                log_likelihood: Some(r.log_likelihood),
                aic: Some(r.aic),
                pseudo_r2: Some(r.pseudo_r2),
                cv_log_loss: Some(r.cv_log_loss),
                best_by_aic: comparison.best_by_aic == Some(kind),
                best_by_cv: comparison.best_by_cv == Some(kind),
                message: None,
            }
        } else if let Some(f) = comparison.failures.iter().find(|f| f.model == kind) {
            ComparisonRow {
                model: kind,
                status: "failed",
                params: None,
                n_rows: f.n_rows,
                log_likelihood: None,
                aic: None,
                pseudo_r2: None,
                cv_log_loss: None,
                best_by_aic: false,
                best_by_cv: false,
                message: Some(format!("{}: {}", f.kind.label(), f.message)),
            }
        } else {
            continue;
        };
        writer
            .serialize(row)
            .map_err(|e| AppError::io(format!("Failed to write comparison CSV row: {e}")))?;
    }

    finish(writer, "comparison CSV")
}

pub fn write_coefficients_csv(path: &Path, rows: &[CoefficientRow]) -> Result<(), AppError> {
    let mut writer = csv_writer(path, "coefficients CSV")?;
    for r in rows {
        writer
            .serialize(r)
            .map_err(|e| AppError::io(format!("Failed to write coefficients CSV row: {e}")))?;
    }
    finish(writer, "coefficients CSV")
}

pub fn write_age_effect_csv(path: &Path, points: &[AgeEffectPoint]) -> Result<(), AppError> {
    let mut writer = csv_writer(path, "age effect CSV")?;
    for p in points {
        writer
            .serialize(p)
            .map_err(|e| AppError::io(format!("Failed to write age effect CSV row: {e}")))?;
    }
    finish(writer, "age effect CSV")
}

pub fn write_summary_json(path: &Path, summary: &RunSummary<'_>) -> Result<(), AppError> {
    let file = create(path, "summary JSON")?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::io(format!("Failed to write summary JSON: {e}")))
}

fn create(path: &Path, what: &str) -> Result<File, AppError> {
    File::create(path).map_err(|e| AppError::io(format!("Failed to create {what} '{}': {e}", path.display())))
}

fn csv_writer(path: &Path, what: &str) -> Result<csv::Writer<File>, AppError> {
    csv::Writer::from_path(path)
        .map_err(|e| AppError::io(format!("Failed to create {what} '{}': {e}", path.display())))
}

fn finish(mut writer: csv::Writer<File>, what: &str) -> Result<(), AppError> {
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush {what}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Area, Flag, Gender, Observation, Race, Violent};
    use crate::io::ingest::load_dataset;

    #[test]
    fn dataset_csv_reads_back_with_missing_ages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.csv");
        let data = Dataset::new(vec![
            Observation {
                outcome: true,
                race: Race::Hispanic,
                age: Some(41),
                gender: Gender::Female,
                high_crime_area: Area(Flag::Yes),
                violent_crime_reason: Violent(Flag::No),
            },
            Observation {
                outcome: false,
                race: Race::White,
                age: None,
                gender: Gender::Male,
                high_crime_area: Area(Flag::No),
                violent_crime_reason: Violent(Flag::Yes),
            },
        ]);

        write_dataset_csv(&path, &data).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("outcome,race,age,gender,high_crime_area,violent_crime_reason\n"));
        assert!(text.contains("0,white,NA,male,N,Y"));
        assert_eq!(load_dataset(&path).unwrap(), data);
    }

    #[test]
    fn out_dir_creation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a").join("b");
        ensure_out_dir(&out).unwrap();
        ensure_out_dir(&out).unwrap();
        assert!(out.is_dir());
    }

    #[test]
    fn coefficient_rows_are_written_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(COEFFICIENTS_FILE);
        let rows = vec![
            CoefficientRow { term: "age".into(), estimate: -0.5, lower: -0.7, upper: -0.3 },
            CoefficientRow { term: "area=Y".into(), estimate: 0.25, lower: 0.0, upper: 0.5 },
        ];
        write_coefficients_csv(&path, &rows).unwrap();
        let lines: Vec<String> = std::fs::read_to_string(&path).unwrap().lines().map(String::from).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "term,estimate,lower,upper");
        assert_eq!(lines[1], "age,-0.5,-0.7,-0.3");
        assert!(lines[2].starts_with("area=Y,"));
    }

    #[test]
    fn failed_model_message_is_quoted_in_comparison_csv() {
        use crate::domain::{FittedModel, ModelFailure};
        use crate::error::ErrorKind;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(COMPARISON_FILE);
        let comparison = ModelComparison {
            null: FittedModel {
                kind: ModelKind::Null,
                terms: vec!["(intercept)".into()],
                coefficients: vec![-1.0],
                std_errors: vec![0.1],
                aliased: vec![false],
                log_likelihood: -60.0,
                n_rows: 100,
                iterations: 3,
                spline: None,
            },
            fits: Vec::new(),
            records: vec![ComparisonRecord {
                model: ModelKind::Main,
                params: 9,
                n_rows: 100,
                log_likelihood: -58.0,
                aic: 134.0,
                pseudo_r2: 0.033,
                cv_log_loss: 0.6,
            }],
            failures: vec![ModelFailure {
                model: ModelKind::Spline,
                kind: ErrorKind::DataIncompatible,
                message: "ages \"30\", all equal".into(),
                n_rows: 100,
            }],
            best_by_aic: Some(ModelKind::Main),
            best_by_cv: Some(ModelKind::Main),
        };

        write_comparison_csv(&path, &comparison).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.get(0), Some("model"));
        assert_eq!(headers.get(10), Some("message"));

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "main");
        assert_eq!(&records[0][1], "ok");
        assert_eq!(&records[0][8], "true");
        assert_eq!(&records[0][10], "");
        assert_eq!(&records[1][0], "spline");
        assert_eq!(&records[1][1], "failed");
        assert_eq!(&records[1][2], "");
        assert_eq!(&records[1][10], "DataIncompatible: ages \"30\", all equal");
    }
}
