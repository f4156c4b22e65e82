//! Shared charting primitives
//!
//! Everything the catalogue renderers have in common: scales and tick
//! breaks, fixed-domain binning, correlation, the mark/scene model with
//! its hover tooltip, axis and legend builders, number formatting and
//! region geometry.

pub mod axis;
pub mod bin;
pub mod breaks;
pub mod format;
pub mod geo;
pub mod legend;
pub mod palette;
pub mod scale;
pub mod scene;
pub mod stats;
pub mod tooltip;

pub use bin::{Bin, Binner};
pub use scale::{BandScale, ColorRamp, LinearScale, OrdinalColor, SequentialColor, TimeScale};
pub use scene::{Anchor, AreaStatus, ChartArea, Frame, Margin, Mark, Scene, Shape, Style};
pub use tooltip::Tooltip;
