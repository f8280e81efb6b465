//! Presentation artifacts derived from fitted models.
//!
//! - `coefficient_table`: non-intercept coefficients with Wald intervals,
//!   sorted by estimate.
//! - `age_effect`: predicted probability over a unit-step age grid with every
//!   other predictor held at its dataset-wide modal level.
//!
//! Intervals use a constant normal quantile (`estimate ± z·SE`), not profile
//! likelihood.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::domain::{
    AgeEffectPoint, CoefficientRow, Dataset, FittedModel, ModalProfile, ModelKind, Observation,
};
use crate::error::AppError;
use crate::models::predict;

/// Two-sided standard normal critical value for `confidence` (0.95 → 1.95996…).
pub fn z_critical(confidence: f64) -> Result<f64, AppError> {
    if !(confidence.is_finite() && confidence > 0.0 && confidence < 1.0) {
        return Err(AppError::config(format!(
            "Confidence level must be in (0, 1), got {confidence}."
        )));
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| AppError::config(format!("Normal distribution error: {e}")))?;
    Ok(normal.inverse_cdf(1.0 - (1.0 - confidence) / 2.0))
}

/// Coefficients of `model` (intercept excluded) with intervals, sorted by
/// estimate ascending; equal estimates are ordered by label.
///
/// Aliased terms and terms without a finite standard error have no interval
/// and are left out.
pub fn coefficient_table(model: &FittedModel, confidence: f64) -> Result<Vec<CoefficientRow>, AppError> {
    let z = z_critical(confidence)?;
    let mut rows: Vec<CoefficientRow> = (1..model.terms.len())
        .filter(|&j| !model.aliased[j] && model.std_errors[j].is_finite())
        .map(|j| {
            let estimate = model.coefficients[j];
            let se = model.std_errors[j];
            CoefficientRow {
                term: model.terms[j].clone(),
                estimate,
                lower: estimate - z * se,
                upper: estimate + z * se,
            }
        })
        .collect();

    rows.sort_by(|a, b| a.estimate.total_cmp(&b.estimate).then_with(|| a.term.cmp(&b.term)));
    Ok(rows)
}

/// Partial age effect with mode-holding.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeEffect {
    pub profile: ModalProfile,
    pub ages: (u32, u32),
    /// One series per model, each covering every grid age in order.
    pub series: Vec<AgeEffectPoint>,
}

impl AgeEffect {
    pub fn points_for(&self, kind: ModelKind) -> impl Iterator<Item = &AgeEffectPoint> {
        self.series.iter().filter(move |p| p.model == kind)
    }
}

/// Predict over the observed age range of `data` for each model in `models`,
/// holding race, gender, area and violent at their modal levels in `data`.
pub fn age_effect(data: &Dataset, models: &[&FittedModel]) -> Result<AgeEffect, AppError> {
    let (lo, hi) = data
        .age_range()
        .ok_or_else(|| AppError::data("No observed ages; cannot build an age grid."))?;
    let profile = data.modal_profile();

    let mut series = Vec::with_capacity(models.len() * (hi - lo + 1) as usize);
    for model in models {
        for age in lo..=hi {
            let row = Observation {
                outcome: false,
                race: profile.race,
                age: Some(age),
                gender: profile.gender,
                high_crime_area: profile.high_crime_area,
                violent_crime_reason: profile.violent_crime_reason,
            };
            let probability = predict(model, &row)?;
            series.push(AgeEffectPoint {
                model: model.kind,
                age,
                probability,
            });
        }
    }

    Ok(AgeEffect {
        profile,
        ages: (lo, hi),
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Area, Flag, Gender, IrlsOptions, Level, Race, Violent};
    use crate::fit::fit_model;
    use approx::assert_abs_diff_eq;

    fn data() -> Dataset {
        let rows = (0..400u32)
            .map(|i| Observation {
                outcome: (i * 7) % 10 < 3,
                race: if i % 3 == 0 { Race::ALL[(i % 5) as usize] } else { Race::Black },
                age: Some(18 + (i * 13) % 50),
                gender: if i % 4 == 0 { Gender::Female } else { Gender::Male },
                high_crime_area: Area(if i % 2 == 0 { Flag::Yes } else { Flag::No }),
                violent_crime_reason: Violent(if i % 5 == 0 { Flag::Yes } else { Flag::No }),
            })
            .collect();
        Dataset::new(rows)
    }

    #[test]
    fn z_for_95_percent() {
        assert_abs_diff_eq!(z_critical(0.95).unwrap(), 1.959964, epsilon = 1e-6);
        assert!(z_critical(1.0).is_err());
    }

    #[test]
    fn coefficient_table_is_sorted_without_intercept() {
        let fit = fit_model(ModelKind::Interaction, &data(), &IrlsOptions::default()).unwrap();
        let table = coefficient_table(&fit, 0.95).unwrap();
        assert_eq!(table.len(), 12);
        assert!(table.iter().all(|r| r.term != "(intercept)"));
        assert!(table.windows(2).all(|w| w[0].estimate <= w[1].estimate));
        assert!(table.iter().all(|r| r.lower <= r.estimate && r.estimate <= r.upper));
    }

    #[test]
    fn aliased_terms_are_left_out_of_the_table() {
        let rows = data()
            .rows()
            .iter()
            .map(|r| Observation {
                race: if r.race == Race::Other { Race::Asian } else { r.race },
                ..*r
            })
            .collect();
        let fit = fit_model(ModelKind::Interaction, &Dataset::new(rows), &IrlsOptions::default()).unwrap();
        let table = coefficient_table(&fit, 0.95).unwrap();
        assert_eq!(table.len(), 10);
        assert!(table.iter().all(|r| !r.term.contains("race=other")));
        assert!(table.iter().all(|r| r.lower.is_finite() && r.upper.is_finite()));
    }

    #[test]
    fn age_grid_holds_modes_and_stays_in_unit_interval() {
        let data = data();
        let main = fit_model(ModelKind::Main, &data, &IrlsOptions::default()).unwrap();
        let spline = fit_model(ModelKind::Spline, &data, &IrlsOptions::default()).unwrap();
        let effect = age_effect(&data, &[&main, &spline]).unwrap();

        assert_eq!(effect.profile.race, Race::Black);
        assert_eq!(effect.profile.gender, Gender::Male);
        assert_eq!(effect.ages, (18, 67));
        assert_eq!(effect.points_for(ModelKind::Main).count(), 50);
        assert_eq!(effect.points_for(ModelKind::Spline).count(), 50);
        assert!(effect.series.iter().all(|p| (0.0..=1.0).contains(&p.probability)));

        let ages: Vec<u32> = effect.points_for(ModelKind::Spline).map(|p| p.age).collect();
        assert_eq!(ages, (18..=67).collect::<Vec<_>>());
    }
}
