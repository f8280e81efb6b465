//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed explicitly between the fitting, comparison and effect stages
//! - exported to JSON/CSV
//! - compared byte-for-byte across reruns with the same seed

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorKind};
use crate::math::NaturalSpline;

/// Inclusive bounds for a recorded age.
pub const AGE_MIN: u32 = 10;
pub const AGE_MAX: u32 = 100;

/// A categorical field with a closed, declared level set.
///
/// The first entry of `ALL` is the reference (baseline) level used for dummy
/// coding. Dummy columns are always generated for `ALL[1..]`, regardless of
/// which levels appear in a given sample.
pub trait Level: Copy + Eq + std::fmt::Debug + 'static {
    /// Column name in the dataset file.
    const FIELD: &'static str;
    /// Short prefix used in coefficient labels (`race=black`).
    const TERM: &'static str;
    /// Declared level set, baseline first.
    const ALL: &'static [Self];

    fn label(self) -> &'static str;

    /// Parse a raw cell (already trimmed). Case-insensitive.
    fn parse(raw: &str) -> Option<Self>;

    fn baseline() -> Self {
        Self::ALL[0]
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|&l| l == self).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Race {
    White,
    Black,
    Hispanic,
    Asian,
    Other,
}

impl Level for Race {
    const FIELD: &'static str = "race";
    const TERM: &'static str = "race";
    const ALL: &'static [Self] = &[
        Race::White,
        Race::Black,
        Race::Hispanic,
        Race::Asian,
        Race::Other,
    ];

    fn label(self) -> &'static str {
        match self {
            Race::White => "white",
            Race::Black => "black",
            Race::Hispanic => "hispanic",
            Race::Asian => "asian",
            Race::Other => "other",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "white" => Some(Race::White),
            "black" => Some(Race::Black),
            "hispanic" => Some(Race::Hispanic),
            "asian" => Some(Race::Asian),
            "other" => Some(Race::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Level for Gender {
    const FIELD: &'static str = "gender";
    const TERM: &'static str = "gender";
    const ALL: &'static [Self] = &[Gender::Male, Gender::Female];

    fn label(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "male" | "m" => Some(Gender::Male),
            "female" | "f" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// Y/N indicator. `N` is the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    #[serde(rename = "N")]
    No,
    #[serde(rename = "Y")]
    Yes,
}

impl Flag {
    fn parse_raw(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "y" | "yes" | "true" | "1" => Some(Flag::Yes),
            "n" | "no" | "false" | "0" => Some(Flag::No),
            _ => None,
        }
    }

    fn flag_label(self) -> &'static str {
        match self {
            Flag::No => "N",
            Flag::Yes => "Y",
        }
    }
}

/// `high_crime_area` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Area(pub Flag);

/// `violent_crime_reason` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Violent(pub Flag);

impl Level for Area {
    const FIELD: &'static str = "high_crime_area";
    const TERM: &'static str = "area";
    const ALL: &'static [Self] = &[Area(Flag::No), Area(Flag::Yes)];

    fn label(self) -> &'static str {
        self.0.flag_label()
    }

    fn parse(raw: &str) -> Option<Self> {
        Flag::parse_raw(raw).map(Area)
    }
}

impl Level for Violent {
    const FIELD: &'static str = "violent_crime_reason";
    const TERM: &'static str = "violent";
    const ALL: &'static [Self] = &[Violent(Flag::No), Violent(Flag::Yes)];

    fn label(self) -> &'static str {
        self.0.flag_label()
    }

    fn parse(raw: &str) -> Option<Self> {
        Flag::parse_raw(raw).map(Violent)
    }
}

/// One encounter record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub outcome: bool,
    pub race: Race,
    pub age: Option<u32>,
    pub gender: Gender,
    pub high_crime_area: Area,
    pub violent_crime_reason: Violent,
}

impl Observation {
    /// True when every predictor required by the model specifications is present.
    pub fn is_complete(&self) -> bool {
        self.age.is_some()
    }

    pub fn outcome_f64(&self) -> f64 {
        if self.outcome { 1.0 } else { 0.0 }
    }
}

/// Dataset-wide modal level of each categorical predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModalProfile {
    pub race: Race,
    pub gender: Gender,
    pub high_crime_area: Area,
    pub violent_crime_reason: Violent,
}

/// Summary stats about a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub n_rows: usize,
    pub n_complete: usize,
    pub n_missing_age: usize,
    pub age_min: Option<u32>,
    pub age_max: Option<u32>,
    pub outcome_rate: f64,
}

/// An immutable, ordered collection of observations.
///
/// Filtering never mutates; it returns a derived dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    rows: Vec<Observation>,
}

impl Dataset {
    pub fn new(rows: Vec<Observation>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows with every required predictor present.
    pub fn complete_cases(&self) -> Dataset {
        Dataset::new(self.rows.iter().filter(|r| r.is_complete()).copied().collect())
    }

    /// Subset by row indices (in the given order).
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset::new(indices.iter().map(|&i| self.rows[i]).collect())
    }

    /// Observed (non-missing) age range.
    pub fn age_range(&self) -> Option<(u32, u32)> {
        let mut ages = self.rows.iter().filter_map(|r| r.age);
        let first = ages.next()?;
        Some(ages.fold((first, first), |(lo, hi), a| (lo.min(a), hi.max(a))))
    }

    pub fn outcome_rate(&self) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let events = self.rows.iter().filter(|r| r.outcome).count();
        events as f64 / self.rows.len() as f64
    }

    /// Most frequent level per categorical field. Ties go to the level
    /// declared first.
    pub fn modal_profile(&self) -> ModalProfile {
        ModalProfile {
            race: mode_of(self.rows.iter().map(|r| r.race)),
            gender: mode_of(self.rows.iter().map(|r| r.gender)),
            high_crime_area: mode_of(self.rows.iter().map(|r| r.high_crime_area)),
            violent_crime_reason: mode_of(self.rows.iter().map(|r| r.violent_crime_reason)),
        }
    }

    pub fn stats(&self) -> DatasetStats {
        let n_complete = self.rows.iter().filter(|r| r.is_complete()).count();
        let range = self.age_range();
        DatasetStats {
            n_rows: self.rows.len(),
            n_complete,
            n_missing_age: self.rows.len() - n_complete,
            age_min: range.map(|r| r.0),
            age_max: range.map(|r| r.1),
            outcome_rate: self.outcome_rate(),
        }
    }
}

fn mode_of<L: Level>(values: impl Iterator<Item = L>) -> L {
    let mut counts = vec![0usize; L::ALL.len()];
    for v in values {
        counts[v.index()] += 1;
    }
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }
    L::ALL[best]
}

/// Concrete model specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Intercept only; reference likelihood for pseudo-R².
    Null,
    /// Linear main effects.
    Main,
    /// Main effects plus a natural cubic spline (df = 3) in age.
    Spline,
    /// Main effects plus race × high-crime-area interaction.
    Interaction,
}

impl ModelKind {
    /// The specifications that are compared, simplest first.
    pub const COMPARED: [ModelKind; 3] = [ModelKind::Main, ModelKind::Spline, ModelKind::Interaction];

    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Null => "null",
            ModelKind::Main => "main",
            ModelKind::Spline => "spline",
            ModelKind::Interaction => "interaction",
        }
    }

    /// Human-readable formula for reports.
    pub fn formula(self) -> &'static str {
        match self {
            ModelKind::Null => "outcome ~ 1",
            ModelKind::Main => "outcome ~ race + age + gender + area + violent",
            ModelKind::Spline => "outcome ~ race + ns(age, df=3) + gender + area + violent",
            ModelKind::Interaction => "outcome ~ race * area + age + gender + violent",
        }
    }
}

/// Immutable result of one maximum-likelihood fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedModel {
    pub kind: ModelKind,
    /// Column labels, intercept first.
    pub terms: Vec<String>,
    /// Aliased columns carry `0.0` here so prediction still works.
    pub coefficients: Vec<f64>,
    /// `NaN` where the standard error is unavailable.
    pub std_errors: Vec<f64>,
    /// `true` for columns with no information in the fitting rows (an
    /// unobserved level or cell, or a column collinear with earlier ones).
    pub aliased: Vec<bool>,
    pub log_likelihood: f64,
    pub n_rows: usize,
    pub iterations: usize,
    /// Knots of the age basis (spline model only), reused for prediction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spline: Option<NaturalSpline>,
}

impl FittedModel {
    /// Number of estimated parameters (the design rank), intercept included.
    pub fn param_count(&self) -> usize {
        self.aliased.iter().filter(|&&a| !a).count()
    }

    /// Labels of the aliased columns.
    pub fn aliased_terms(&self) -> Vec<&str> {
        self.terms
            .iter()
            .zip(&self.aliased)
            .filter(|(_, a)| **a)
            .map(|(t, _)| t.as_str())
            .collect()
    }
}

/// Per-model comparison metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRecord {
    pub model: ModelKind,
    pub params: usize,
    pub n_rows: usize,
    pub log_likelihood: f64,
    pub aic: f64,
    pub pseudo_r2: f64,
    pub cv_log_loss: f64,
}

/// A model that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelFailure {
    pub model: ModelKind,
    pub kind: ErrorKind,
    pub message: String,
    pub n_rows: usize,
}

/// One row of the coefficient display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientRow {
    pub term: String,
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
}

/// One point of a partial age-effect series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgeEffectPoint {
    pub model: ModelKind,
    pub age: u32,
    pub probability: f64,
}

/// IRLS controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IrlsOptions {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for IrlsOptions {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            tolerance: 1e-8,
        }
    }
}

/// A full analysis run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus env/defaults).
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    pub input: PathBuf,
    pub out_dir: PathBuf,
    /// Seed for the CV fold partition.
    pub seed: u64,
    pub folds: usize,
    /// Confidence level for coefficient intervals, e.g. 0.95.
    pub confidence: f64,
    pub irls: IrlsOptions,
    pub plot_width: u32,
    pub plot_height: u32,
    /// Fit models and folds in parallel.
    pub parallel: bool,
}

impl RunConfig {
    /// Reject settings that would fail later in the run, before any fitting.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.folds < 2 {
            return Err(AppError::config(format!("Fold count must be >= 2, got {}.", self.folds)));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(AppError::config(format!(
                "Confidence level must be in (0, 1), got {}.",
                self.confidence
            )));
        }
        if self.plot_width == 0 || self.plot_height == 0 {
            return Err(AppError::config(format!(
                "Plot size must be positive, got {}x{}.",
                self.plot_width, self.plot_height
            )));
        }
        if self.irls.max_iterations == 0 || !(self.irls.tolerance > 0.0) {
            return Err(AppError::config("IRLS needs max iterations >= 1 and tolerance > 0."));
        }
        Ok(())
    }
}

/// Synthetic dataset generation settings.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateConfig {
    pub out: PathBuf,
    pub rows: usize,
    pub seed: u64,
    pub outcome_rate: f64,
    pub age_missing_rate: f64,
}
