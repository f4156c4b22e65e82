//! Color constants

/// Color-blind safe categorical colors (Okabe & Ito)
pub const CATEGORICAL: &[&str] = &[
    "#0072B2", "#E69F00", "#D55E00", "#009E73", "#CC79A7", "#56B4E9", "#F0E442", "#000000",
];

/// Larger categorical set for many series
pub const CATEGORY10: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Light to dark blue, for magnitudes
pub const SEQUENTIAL_BLUES: &[&str] = &["#deebf7", "#9ecae1", "#4292c6", "#08519c", "#08306b"];

/// Blue through white to red, for values in `[-1, 1]`
pub const DIVERGING: &[&str] = &["#2166ac", "#f7f7f7", "#b2182b"];

/// Fill for regions without data
pub const NO_DATA: &str = "#d9d9d9";

pub const AXIS: &str = "#333333";
pub const GRID: &str = "#e5e5e5";
pub const MEAN_MARKER: &str = "#D55E00";

/// Categorical palette sized for `n` categories
pub fn categorical(n: usize) -> &'static [&'static str] {
    if n <= CATEGORICAL.len() {
        CATEGORICAL
    } else {
        CATEGORY10
    }
}
