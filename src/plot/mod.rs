//! PNG chart rendering with Plotters.
//!
//! Two charts are produced per run:
//! - coefficient plot: one row per term, point estimate with interval whiskers
//! - age effect plot: predicted probability vs age, one line per model
//!
//! All series and bounds are computed before drawing so the render functions
//! only draw.
//!
//! Text is rasterized with an embedded DejaVu Sans registered as `sans-serif`,
//! so rendering does not depend on system fonts.

use std::error::Error;
use std::path::Path;
use std::sync::OnceLock;

use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};

use crate::domain::{CoefficientRow, ModelKind};
use crate::effects::AgeEffect;
use crate::error::AppError;

pub const COEFFICIENT_PLOT_FILE: &str = "coefficients.png";
pub const AGE_EFFECT_PLOT_FILE: &str = "age_effect.png";

const FONT_FAMILY: &str = "sans-serif";
const FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

type DrawResult = Result<(), Box<dyn Error>>;

/// Register the embedded font once per process.
fn ensure_font() -> Result<(), AppError> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED.get_or_init(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok());
    if ok {
        Ok(())
    } else {
        Err(AppError::io("Embedded chart font could not be loaded."))
    }
}

/// Render the coefficient display (`rows` in display order, bottom to top).
pub fn render_coefficient_plot(
    path: &Path,
    rows: &[CoefficientRow],
    title: &str,
    size: (u32, u32),
) -> Result<(), AppError> {
    if rows.is_empty() {
        return Err(AppError::data("No coefficients to plot."));
    }
    ensure_font()?;
    draw_coefficients(path, rows, title, size)
        .map_err(|e| AppError::io(format!("Failed to render '{}': {e}", path.display())))
}

fn draw_coefficients(path: &Path, rows: &[CoefficientRow], title: &str, size: (u32, u32)) -> DrawResult {
    let lo = rows.iter().map(|r| r.lower).fold(0.0_f64, f64::min);
    let hi = rows.iter().map(|r| r.upper).fold(0.0_f64, f64::max);
    let pad = ((hi - lo) * 0.05).max(1e-3);
    let (x0, x1) = (lo - pad, hi + pad);
    let n = rows.len() as i32;

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT_FAMILY, 18))
        .margin(12)
        .set_label_area_size(LabelAreaPosition::Left, 150)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(x0..x1, (0..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc("log-odds estimate")
        .y_labels(rows.len())
        .y_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => rows
                .get(*i as usize)
                .map(|r| r.term.clone())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    // Reference line at zero effect.
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(0.0, SegmentValue::Exact(0)), (0.0, SegmentValue::Last)],
        BLACK.mix(0.4),
    )))?;

    chart.draw_series(rows.iter().enumerate().map(|(i, r)| {
        PathElement::new(
            vec![
                (r.lower, SegmentValue::CenterOf(i as i32)),
                (r.upper, SegmentValue::CenterOf(i as i32)),
            ],
            BLUE.stroke_width(2),
        )
    }))?;

    chart.draw_series(
        rows.iter()
            .enumerate()
            .map(|(i, r)| Circle::new((r.estimate, SegmentValue::CenterOf(i as i32)), 4, BLUE.filled())),
    )?;

    root.present()?;
    Ok(())
}

/// Render predicted probability vs age, one line per model in `effect`.
pub fn render_age_effect_plot(path: &Path, effect: &AgeEffect, size: (u32, u32)) -> Result<(), AppError> {
    if effect.series.is_empty() {
        return Err(AppError::data("No age effect points to plot."));
    }
    ensure_font()?;
    draw_age_effect(path, effect, size)
        .map_err(|e| AppError::io(format!("Failed to render '{}': {e}", path.display())))
}

fn draw_age_effect(path: &Path, effect: &AgeEffect, size: (u32, u32)) -> DrawResult {
    let (a0, a1) = effect.ages;
    let x0 = f64::from(a0);
    // A single observed age still needs a non-empty axis.
    let x1 = f64::from(a1).max(x0 + 1.0);

    let p_lo = effect.series.iter().map(|p| p.probability).fold(f64::INFINITY, f64::min);
    let p_hi = effect.series.iter().map(|p| p.probability).fold(f64::NEG_INFINITY, f64::max);
    let pad = ((p_hi - p_lo) * 0.1).max(0.01);
    let (y0, y1) = ((p_lo - pad).max(0.0), (p_hi + pad).min(1.0));

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Partial effect of age (other predictors at modal level)", (FONT_FAMILY, 18))
        .margin(12)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .x_desc("age")
        .y_desc("P(outcome)")
        .x_labels(10)
        .y_labels(8)
        .y_label_formatter(&|v| format!("{v:.3}"))
        .draw()?;

    for (kind, color) in [(ModelKind::Main, BLUE), (ModelKind::Spline, RED)] {
        let points: Vec<(f64, f64)> = effect
            .points_for(kind)
            .map(|p| (f64::from(p.age), p.probability))
            .collect();
        if points.is_empty() {
            continue;
        }
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))?
            .label(kind.display_name())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgeEffectPoint, Area, Flag, Gender, ModalProfile, Race, Violent};

    fn effect() -> AgeEffect {
        let mut series = Vec::new();
        for kind in [ModelKind::Main, ModelKind::Spline] {
            for age in 18..=60 {
                let probability = 0.2 + 0.001 * f64::from(age) + if kind == ModelKind::Spline { 0.01 } else { 0.0 };
                series.push(AgeEffectPoint { model: kind, age, probability });
            }
        }
        AgeEffect {
            profile: ModalProfile {
                race: Race::White,
                gender: Gender::Male,
                high_crime_area: Area(Flag::No),
                violent_crime_reason: Violent(Flag::No),
            },
            ages: (18, 60),
            series,
        }
    }

    const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

    #[test]
    fn writes_png_files() {
        let dir = tempfile::tempdir().unwrap();

        let coef = dir.path().join(COEFFICIENT_PLOT_FILE);
        let rows = vec![
            CoefficientRow { term: "race=black".into(), estimate: -0.3, lower: -0.6, upper: 0.0 },
            CoefficientRow { term: "area=Y".into(), estimate: 0.2, lower: -0.1, upper: 0.5 },
        ];
        render_coefficient_plot(&coef, &rows, "interaction model", (640, 480)).unwrap();
        let png = std::fs::read(&coef).unwrap();
        assert!(png.starts_with(PNG_SIGNATURE));

        let age = dir.path().join(AGE_EFFECT_PLOT_FILE);
        render_age_effect_plot(&age, &effect(), (640, 480)).unwrap();
        let png = std::fs::read(&age).unwrap();
        assert!(png.starts_with(PNG_SIGNATURE));
        assert!(png.len() > 1000);
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(render_coefficient_plot(&dir.path().join("c.png"), &[], "t", (100, 100)).is_err());
    }
}
