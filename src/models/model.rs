//! Design matrices for the four logistic specifications.
//!
//! The fitter relies on two primitive operations:
//! - build a design row for a given observation (for IRLS)
//! - predict `P(outcome = 1)` given fitted coefficients (for CV and effect grids)
//!
//! Column layout (reference coding against the first declared level):
//!
//! | kind        | columns                                                         |
//! |-------------|-----------------------------------------------------------------|
//! | null        | intercept                                                       |
//! | main        | intercept, race×4, age, gender, area, violent                   |
//! | spline      | intercept, race×4, ns(age)×3, gender, area, violent             |
//! | interaction | intercept, race×4, age, gender, area, violent, race:area×4      |

use nalgebra::{DMatrix, DVector};

use crate::domain::{Area, Dataset, FittedModel, Gender, Level, ModelKind, Observation, Race, Violent};
use crate::error::AppError;
use crate::math::{NaturalSpline, sigmoid};

/// Degrees of freedom of the age spline.
pub const AGE_SPLINE_DF: usize = 3;

/// A model specification bound to its data-dependent pieces (spline knots).
#[derive(Debug, Clone, PartialEq)]
pub struct Design {
    pub kind: ModelKind,
    pub spline: Option<NaturalSpline>,
}

impl Design {
    /// Bind `kind` to `data`. For the spline model, knots are placed on the
    /// ages of `data` (the training rows).
    pub fn for_data(kind: ModelKind, data: &Dataset) -> Result<Self, AppError> {
        let spline = match kind {
            ModelKind::Spline => {
                let ages: Vec<f64> = data.rows().iter().filter_map(|r| r.age).map(f64::from).collect();
                Some(NaturalSpline::from_data(&ages, AGE_SPLINE_DF)?)
            }
            _ => None,
        };
        Ok(Self { kind, spline })
    }

    /// Rebuild the design a fitted model was estimated with.
    pub fn from_fitted(model: &FittedModel) -> Self {
        Self {
            kind: model.kind,
            spline: model.spline.clone(),
        }
    }

    pub fn column_count(&self) -> usize {
        let categorical = dummy_count::<Race>()
            + dummy_count::<Gender>()
            + dummy_count::<Area>()
            + dummy_count::<Violent>();
        match self.kind {
            ModelKind::Null => 1,
            ModelKind::Main => 1 + categorical + 1,
            ModelKind::Spline => 1 + categorical + AGE_SPLINE_DF,
            ModelKind::Interaction => 1 + categorical + 1 + dummy_count::<Race>() * dummy_count::<Area>(),
        }
    }

    /// Column labels, intercept first.
    pub fn names(&self) -> Vec<String> {
        let mut out = vec!["(intercept)".to_string()];
        if self.kind == ModelKind::Null {
            return out;
        }
        out.extend(dummy_names::<Race>());
        match &self.spline {
            Some(spline) if self.kind == ModelKind::Spline => out.extend(spline.names("age")),
            _ => out.push("age".to_string()),
        }
        out.extend(dummy_names::<Gender>());
        out.extend(dummy_names::<Area>());
        out.extend(dummy_names::<Violent>());
        if self.kind == ModelKind::Interaction {
            for race in dummy_names::<Race>() {
                for area in dummy_names::<Area>() {
                    out.push(format!("{race}:{area}"));
                }
            }
        }
        out
    }

    /// Fill a design row for `obs` into `out` (cleared first).
    pub fn fill_row(&self, obs: &Observation, out: &mut Vec<f64>) -> Result<(), AppError> {
        out.clear();
        out.push(1.0);
        if self.kind == ModelKind::Null {
            return Ok(());
        }

        let age = obs
            .age
            .ok_or_else(|| AppError::data("Design row requested for an observation with missing age."))?;

        push_dummies(obs.race, out);
        match self.kind {
            ModelKind::Spline => {
                let spline = self
                    .spline
                    .as_ref()
                    .ok_or_else(|| AppError::data("Spline design has no knots."))?;
                let start = out.len();
                out.resize(start + spline.df(), 0.0);
                spline.fill_row(f64::from(age), &mut out[start..]);
            }
            _ => out.push(f64::from(age)),
        }
        push_dummies(obs.gender, out);
        push_dummies(obs.high_crime_area, out);
        push_dummies(obs.violent_crime_reason, out);

        if self.kind == ModelKind::Interaction {
            for &race in &Race::ALL[1..] {
                for &area in &Area::ALL[1..] {
                    let on = obs.race == race && obs.high_crime_area == area;
                    out.push(if on { 1.0 } else { 0.0 });
                }
            }
        }
        Ok(())
    }

    /// Design matrix and response vector for `data`.
    pub fn matrix(&self, data: &Dataset) -> Result<(DMatrix<f64>, DVector<f64>), AppError> {
        let n = data.len();
        let p = self.column_count();
        let mut x = DMatrix::<f64>::zeros(n, p);
        let mut y = DVector::<f64>::zeros(n);
        let mut row = Vec::with_capacity(p);

        for (i, obs) in data.rows().iter().enumerate() {
            self.fill_row(obs, &mut row)?;
            for (j, &v) in row.iter().enumerate() {
                x[(i, j)] = v;
            }
            y[i] = obs.outcome_f64();
        }
        Ok((x, y))
    }
}

/// Linear predictor `xᵀβ` for one observation.
pub fn linear_predictor(model: &FittedModel, obs: &Observation) -> Result<f64, AppError> {
    let design = Design::from_fitted(model);
    let mut row = Vec::with_capacity(model.coefficients.len());
    design.fill_row(obs, &mut row)?;
    if row.len() != model.coefficients.len() {
        return Err(AppError::data(format!(
            "Design width {} does not match {} coefficients for model {}.",
            row.len(),
            model.coefficients.len(),
            model.kind.display_name()
        )));
    }
    Ok(row.iter().zip(&model.coefficients).map(|(x, b)| x * b).sum())
}

/// Predicted `P(outcome = 1)` for one observation.
pub fn predict(model: &FittedModel, obs: &Observation) -> Result<f64, AppError> {
    linear_predictor(model, obs).map(sigmoid)
}

fn dummy_count<L: Level>() -> usize {
    L::ALL.len() - 1
}

fn dummy_names<L: Level>() -> Vec<String> {
    L::ALL[1..]
        .iter()
        .map(|l| format!("{}={}", L::TERM, l.label()))
        .collect()
}

fn push_dummies<L: Level>(value: L, out: &mut Vec<f64>) {
    for &level in &L::ALL[1..] {
        out.push(if value == level { 1.0 } else { 0.0 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Flag;

    fn obs(race: Race, area: Flag, age: u32) -> Observation {
        Observation {
            outcome: true,
            race,
            age: Some(age),
            gender: Gender::Female,
            high_crime_area: Area(area),
            violent_crime_reason: Violent(Flag::No),
        }
    }

    fn data() -> Dataset {
        Dataset::new((0..30).map(|i| obs(Race::ALL[i % 5], Flag::Yes, 20 + i as u32)).collect())
    }

    #[test]
    fn column_counts_match_names() {
        for kind in [ModelKind::Null, ModelKind::Main, ModelKind::Spline, ModelKind::Interaction] {
            let design = Design::for_data(kind, &data()).unwrap();
            assert_eq!(design.names().len(), design.column_count(), "{kind:?}");
        }
        assert_eq!(Design::for_data(ModelKind::Main, &data()).unwrap().column_count(), 9);
        assert_eq!(Design::for_data(ModelKind::Spline, &data()).unwrap().column_count(), 11);
        assert_eq!(Design::for_data(ModelKind::Interaction, &data()).unwrap().column_count(), 13);
    }

    #[test]
    fn interaction_labels_name_both_fields() {
        let design = Design::for_data(ModelKind::Interaction, &data()).unwrap();
        let names = design.names();
        assert!(names.contains(&"race=black".to_string()));
        assert!(names.contains(&"area=Y".to_string()));
        assert!(names.contains(&"race=black:area=Y".to_string()));
        assert!(!names.iter().any(|n| n == "race=white"));
    }

    #[test]
    fn interaction_row_sets_single_cell() {
        let design = Design::for_data(ModelKind::Interaction, &data()).unwrap();
        let mut row = Vec::new();
        design.fill_row(&obs(Race::Asian, Flag::Yes, 40), &mut row).unwrap();
        let names = design.names();
        let on: Vec<&str> = names
            .iter()
            .zip(&row)
            .filter(|(n, v)| n.contains(':') && **v == 1.0)
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(on, vec!["race=asian:area=Y"]);

        design.fill_row(&obs(Race::White, Flag::Yes, 40), &mut row).unwrap();
        assert_eq!(row[9..].iter().sum::<f64>(), 0.0);
    }

    #[test]
    fn missing_age_is_rejected_for_age_models() {
        let design = Design::for_data(ModelKind::Main, &data()).unwrap();
        let mut o = obs(Race::White, Flag::No, 30);
        o.age = None;
        let mut row = Vec::new();
        assert!(design.fill_row(&o, &mut row).is_err());

        let null = Design::for_data(ModelKind::Null, &data()).unwrap();
        assert!(null.fill_row(&o, &mut row).is_ok());
    }
}
