//! Tick positions for axes and legends

use chrono::{Datelike, Duration, NaiveDate};

pub const DEFAULT_TICK_COUNT: usize = 5;

// Talbot, Lin & Hanrahan (2010), step multipliers from most to least preferred
const Q: &[f64] = &[1.0, 5.0, 2.0, 2.5, 4.0, 3.0];

const W_SIMPLICITY: f64 = 0.2;
const W_COVERAGE: f64 = 0.25;
const W_DENSITY: f64 = 0.5;
const W_LEGIBILITY: f64 = 0.05;

/// Ticks that cover `[min, max]` with about `target` round values.
///
/// Candidates are scored on simplicity, coverage and density (the extended
/// Wilkinson search). Falls back to [`nice_breaks`] when no candidate covers
/// the range.
pub fn extended_breaks(min: f64, max: f64, target: usize) -> Vec<f64> {
    if target == 0 || !min.is_finite() || !max.is_finite() || min >= max {
        return vec![];
    }
    let span = max - min;

    let mut best_score = f64::NEG_INFINITY;
    let mut best = Vec::new();

    for skip in 1..=target.max(10) {
        for (qi, &q) in Q.iter().enumerate() {
            let simplicity = 1.0 - qi as f64 / Q.len() as f64 - (skip as f64 - 1.0) / 10.0;
            if W_SIMPLICITY * simplicity + W_COVERAGE + W_DENSITY + W_LEGIBILITY < best_score {
                continue;
            }

            for count in 2..=(target * 2).max(10) {
                let density = density_score(count, target);
                if W_SIMPLICITY * simplicity + W_COVERAGE + W_DENSITY * density + W_LEGIBILITY
                    < best_score
                {
                    continue;
                }

                let delta = span / (count as f64 - 1.0) * skip as f64;
                let step = q * 10f64.powf((delta / q).log10().round());
                let lo = (min / step).floor() * step;
                let hi = lo + step * (count as f64 - 1.0);
                if hi < max {
                    continue;
                }

                let score = W_SIMPLICITY * simplicity
                    + W_COVERAGE * coverage_score(min, max, lo, hi)
                    + W_DENSITY * density
                    + W_LEGIBILITY;
                if score > best_score {
                    best_score = score;
                    best = (0..count).map(|i| lo + step * i as f64).collect();
                }
            }
        }
    }

    if best.is_empty() {
        return nice_breaks(min, max, target);
    }
    best.into_iter().map(clean).collect()
}

fn coverage_score(min: f64, max: f64, lo: f64, hi: f64) -> f64 {
    let covered = hi - lo;
    if covered == 0.0 {
        return 0.0;
    }
    (1.0 - 0.5 * (covered - (max - min)) / (max - min)).max(0.0)
}

fn density_score(count: usize, target: usize) -> f64 {
    let ratio = count as f64 / target as f64;
    if ratio >= 1.0 {
        2.0 - ratio
    } else {
        ratio
    }
}

/// Remove float noise such as `0.30000000000000004`
fn clean(value: f64) -> f64 {
    let rounded = (value * 1e9).round() / 1e9;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// The 1-2-5 step rule: ticks on multiples of a round step
pub fn nice_breaks(min: f64, max: f64, target: usize) -> Vec<f64> {
    if target == 0 || !min.is_finite() || !max.is_finite() || min >= max {
        return vec![];
    }
    let step = nice_step((max - min) / target as f64);
    let lo = (min / step).floor() * step;
    let hi = (max / step).ceil() * step;

    let mut ticks = Vec::new();
    let mut i = 0;
    loop {
        let value = lo + step * i as f64;
        if value > hi + step * 0.5 {
            break;
        }
        ticks.push(clean(value));
        i += 1;
    }
    ticks
}

/// Round a rough step up to 1, 2, 5 or 10 times a power of ten
pub fn nice_step(rough: f64) -> f64 {
    if rough <= 0.0 || !rough.is_finite() {
        return 1.0;
    }
    let magnitude = 10f64.powf(rough.log10().floor());
    let residual = rough / magnitude;
    let factor = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    factor * magnitude
}

/// Exactly `n` evenly spaced values from `min` to `max`
pub fn linear_breaks(min: f64, max: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![(min + max) / 2.0],
        _ => {
            let step = (max - min) / (n - 1) as f64;
            (0..n).map(|i| min + step * i as f64).collect()
        }
    }
}

/// Keep ticks inside `[min, max]`, with a small tolerance
pub fn within(ticks: &[f64], min: f64, max: f64) -> Vec<f64> {
    let eps = (max - min).abs() * 1e-9;
    ticks
        .iter()
        .copied()
        .filter(|t| *t >= min - eps && *t <= max + eps)
        .collect()
}

/// Date ticks on day, week or month boundaries, about `target` of them
pub fn date_breaks(min: NaiveDate, max: NaiveDate, target: usize) -> Vec<NaiveDate> {
    if min > max || target == 0 {
        return vec![];
    }
    let days = (max - min).num_days().max(1);
    let wanted = (days as f64 / target as f64).max(1.0);

    let mut ticks = Vec::new();
    if wanted <= 14.0 {
        let step = [1i64, 2, 7, 14]
            .into_iter()
            .find(|s| *s as f64 >= wanted)
            .unwrap_or(14);
        let mut current = if step >= 7 {
            min - Duration::days(min.weekday().num_days_from_monday() as i64)
        } else {
            min
        };
        while current <= max {
            if current >= min {
                ticks.push(current);
            }
            current += Duration::days(step);
        }
    } else {
        let months = ((wanted / 30.0).ceil() as i32).max(1);
        let mut year = min.year();
        let mut month = min.month() as i32;
        if min.day() > 1 {
            month += 1;
            if month > 12 {
                month = 1;
                year += 1;
            }
        }
        while let Some(current) = NaiveDate::from_ymd_opt(year, month as u32, 1) {
            if current > max {
                break;
            }
            if current >= min {
                ticks.push(current);
            }
            month += months;
            while month > 12 {
                month -= 12;
                year += 1;
            }
        }
    }
    ticks
}
