//! Additive trend + seasonality model.
//!
//! `y(t) = trend(t) + Σ seasonal(t) + ε`, where the trend is piecewise linear
//! with slope changes at fixed changepoints and each seasonality is a
//! truncated Fourier series. Coefficients come from one penalised
//! least-squares solve on scaled data; the penalties play the role of
//! zero-mean priors (tight on slope changes, loose on seasonality).

use super::linalg::{normal_equations, solve};
use super::{make_future_dates, ForecastError, ForecastRow, Forecaster, SeriesPoint};
use chrono::{Datelike, NaiveDate};
use std::f64::consts::PI;

// Two-sided 80% normal quantile.
const INTERVAL_Z: f64 = 1.281_551_565_544_600_4;

const YEARLY_MIN_SPAN_DAYS: f64 = 730.0;
const WEEKLY_MIN_SPAN_DAYS: f64 = 14.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seasonality {
    pub name: &'static str,
    pub period_days: f64,
    pub fourier_order: usize,
}

pub const YEARLY: Seasonality = Seasonality {
    name: "yearly",
    period_days: 365.25,
    fourier_order: 10,
};

pub const WEEKLY: Seasonality = Seasonality {
    name: "weekly",
    period_days: 7.0,
    fourier_order: 3,
};

pub const DAILY: Seasonality = Seasonality {
    name: "daily",
    period_days: 1.0,
    fourier_order: 4,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonalityMode {
    /// On when the history is long enough to see a few cycles.
    Auto,
    On,
    Off,
}

#[derive(Debug, Clone)]
pub struct AdditiveConfig {
    pub n_changepoints: usize,
    /// Fraction of the history in which changepoints may be placed.
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub trend_prior_scale: f64,
    /// Assumed noise level of the scaled series, used to turn prior scales
    /// into ridge penalties.
    pub noise_scale: f64,
    pub yearly: SeasonalityMode,
    pub weekly: SeasonalityMode,
    pub daily: SeasonalityMode,
}

impl Default for AdditiveConfig {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            trend_prior_scale: 5.0,
            noise_scale: 0.1,
            yearly: SeasonalityMode::Auto,
            weekly: SeasonalityMode::Auto,
            daily: SeasonalityMode::On,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdditiveForecaster {
    config: AdditiveConfig,
}

/// Fitted coefficients plus everything needed to extrapolate.
#[derive(Debug, Clone)]
pub struct AdditiveModel {
    history: Vec<NaiveDate>,
    start: NaiveDate,
    span_days: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    seasonalities: Vec<Seasonality>,
    beta: Vec<f64>,
    sigma: f64,
    mean_abs_delta: f64,
}

impl AdditiveModel {
    pub fn history(&self) -> &[NaiveDate] {
        &self.history
    }

    pub fn seasonalities(&self) -> &[Seasonality] {
        &self.seasonalities
    }

    pub fn changepoint_count(&self) -> usize {
        self.changepoints.len()
    }

    fn scaled_time(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64 / self.span_days
    }

    fn row(&self, date: NaiveDate) -> Vec<f64> {
        design_row(
            self.scaled_time(date),
            date,
            &self.changepoints,
            &self.seasonalities,
        )
    }

    /// Scaled variance of the trend drift `horizon` (scaled time) past the
    /// end of the history, treating future slope changes as Laplace jumps
    /// arriving at the historical changepoint rate.
    fn trend_variance(&self, horizon: f64) -> f64 {
        if horizon <= 0.0 || self.changepoints.is_empty() {
            return 0.0;
        }
        let rate = self.changepoints.len() as f64;
        let jump_var = 2.0 * self.mean_abs_delta.powi(2);
        jump_var * rate * horizon.powi(3) / 3.0
    }
}

impl AdditiveForecaster {
    pub fn new(config: AdditiveConfig) -> Self {
        Self { config }
    }

    fn active_seasonalities(&self, span_days: f64) -> Vec<Seasonality> {
        let enabled = |mode: SeasonalityMode, min_span: f64| match mode {
            SeasonalityMode::On => true,
            SeasonalityMode::Off => false,
            SeasonalityMode::Auto => span_days >= min_span,
        };

        let mut out = Vec::new();
        if enabled(self.config.yearly, YEARLY_MIN_SPAN_DAYS) {
            out.push(YEARLY);
        }
        if enabled(self.config.weekly, WEEKLY_MIN_SPAN_DAYS) {
            out.push(WEEKLY);
        }
        if enabled(self.config.daily, 0.0) {
            out.push(DAILY);
        }
        out
    }

    /// Changepoints sit on observed dates, evenly spaced by index through the
    /// first `changepoint_range` of the history, never on the first point.
    fn changepoints(&self, t: &[f64]) -> Vec<f64> {
        let hist_size = (t.len() as f64 * self.config.changepoint_range).floor() as usize;
        let n = self.config.n_changepoints.min(hist_size.saturating_sub(1));
        if n == 0 {
            return Vec::new();
        }

        let last_idx = (hist_size - 1) as f64;
        (1..=n)
            .map(|i| {
                let idx = (last_idx * i as f64 / n as f64).round() as usize;
                t[idx]
            })
            .collect()
    }

    fn penalties(&self, n_changepoints: usize, seasonalities: &[Seasonality]) -> Vec<f64> {
        let noise_var = self.config.noise_scale.powi(2);
        let ridge = |scale: f64| noise_var / scale.powi(2);

        let n_seasonal: usize = seasonalities.iter().map(|s| 2 * s.fourier_order).sum();
        let mut out = Vec::with_capacity(2 + n_changepoints + n_seasonal);
        out.push(ridge(self.config.trend_prior_scale));
        out.push(ridge(self.config.trend_prior_scale));
        out.extend(std::iter::repeat(ridge(self.config.changepoint_prior_scale)).take(n_changepoints));
        out.extend(std::iter::repeat(ridge(self.config.seasonality_prior_scale)).take(n_seasonal));
        out
    }
}

impl Forecaster for AdditiveForecaster {
    type Model = AdditiveModel;

    fn fit(&self, series: &[SeriesPoint]) -> Result<AdditiveModel, ForecastError> {
        let mut points = series.to_vec();
        points.sort_by_key(|p| p.ds);
        points.dedup_by_key(|p| p.ds);

        if points.len() < 2 {
            return Err(ForecastError::InsufficientData {
                points: points.len(),
            });
        }
        if points.iter().any(|p| !p.y.is_finite()) {
            return Err(ForecastError::Degenerate("non-finite value in series".into()));
        }

        let (min, max) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.y), hi.max(p.y))
            });
        if max == min {
            return Err(ForecastError::Degenerate(format!(
                "every close equals {min}"
            )));
        }

        let y_scale = min.abs().max(max.abs());
        let start = points[0].ds;
        let span_days = (points[points.len() - 1].ds - start).num_days() as f64;

        let t: Vec<f64> = points
            .iter()
            .map(|p| (p.ds - start).num_days() as f64 / span_days)
            .collect();
        let changepoints = self.changepoints(&t);
        let seasonalities = self.active_seasonalities(span_days);

        let rows: Vec<Vec<f64>> = points
            .iter()
            .zip(&t)
            .map(|(p, &ti)| design_row(ti, p.ds, &changepoints, &seasonalities))
            .collect();
        let y: Vec<f64> = points.iter().map(|p| p.y / y_scale).collect();
        let penalty = self.penalties(changepoints.len(), &seasonalities);

        let (xtx, xty) = normal_equations(&rows, &y, &penalty);
        let beta = solve(xtx, xty, penalty.len())
            .ok_or_else(|| ForecastError::Numerical("model fit did not converge".into()))?;

        let sse: f64 = rows
            .iter()
            .zip(&y)
            .map(|(row, &target)| (target - dot(row, &beta)).powi(2))
            .sum();
        let sigma = (sse / rows.len() as f64).sqrt();

        let deltas = &beta[2..2 + changepoints.len()];
        let mean_abs_delta = if deltas.is_empty() {
            0.0
        } else {
            deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64
        };

        tracing::debug!(
            points = points.len(),
            span_days,
            changepoints = changepoints.len(),
            seasonalities = ?seasonalities.iter().map(|s| s.name).collect::<Vec<_>>(),
            sigma,
            "fitted additive model"
        );

        Ok(AdditiveModel {
            history: points.iter().map(|p| p.ds).collect(),
            start,
            span_days,
            y_scale,
            changepoints,
            seasonalities,
            beta,
            sigma,
            mean_abs_delta,
        })
    }

    fn predict(
        &self,
        model: &AdditiveModel,
        horizon_days: u32,
    ) -> Result<Vec<ForecastRow>, ForecastError> {
        make_future_dates(&model.history, horizon_days)
            .into_iter()
            .map(|ds| {
                let t = model.scaled_time(ds);
                let yhat = dot(&model.row(ds), &model.beta) * model.y_scale;
                let variance = model.sigma.powi(2) + model.trend_variance(t - 1.0);
                let half_width = INTERVAL_Z * variance.sqrt() * model.y_scale;

                if !yhat.is_finite() || !half_width.is_finite() {
                    return Err(ForecastError::Numerical(format!(
                        "non-finite prediction for {ds}"
                    )));
                }

                Ok(ForecastRow {
                    ds,
                    yhat,
                    yhat_lower: yhat - half_width,
                    yhat_upper: yhat + half_width,
                })
            })
            .collect()
    }
}

fn design_row(
    t: f64,
    date: NaiveDate,
    changepoints: &[f64],
    seasonalities: &[Seasonality],
) -> Vec<f64> {
    let mut row = Vec::with_capacity(2 + changepoints.len() + seasonalities.len() * 8);
    row.push(1.0);
    row.push(t);
    row.extend(changepoints.iter().map(|&c| (t - c).max(0.0)));

    let day = f64::from(date.num_days_from_ce());
    for s in seasonalities {
        let phase = day.rem_euclid(s.period_days) / s.period_days;
        for k in 1..=s.fourier_order {
            let x = 2.0 * PI * k as f64 * phase;
            row.push(x.sin());
            row.push(x.cos());
        }
    }
    row
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
