//! Scales: mappings from data domains to pixel ranges or colors

use chrono::NaiveDate;

use super::breaks;

/// Continuous linear mapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    /// Scale over the extent of `values`, `(0, 1)` when there are none
    pub fn from_extent(values: impl IntoIterator<Item = f64>, range: (f64, f64)) -> Self {
        Self::new(extent(values).unwrap_or((0.0, 1.0)), range)
    }

    /// Include zero in the domain (bar charts)
    pub fn with_zero(mut self) -> Self {
        self.domain = (self.domain.0.min(0.0), self.domain.1.max(0.0));
        self
    }

    /// Extend the domain outwards to round tick values
    pub fn nice(mut self, count: usize) -> Self {
        let (lo, hi) = self.domain;
        if lo == hi {
            self.domain = if lo == 0.0 { (0.0, 1.0) } else { (lo.min(0.0), hi.max(0.0)) };
            return self;
        }
        let step = breaks::nice_step((hi - lo) / count.max(1) as f64);
        self.domain = ((lo / step).floor() * step, (hi / step).ceil() * step);
        self
    }

    pub fn map(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }

    pub fn invert(&self, pixel: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return d0;
        }
        d0 + (pixel - r0) / (r1 - r0) * (d1 - d0)
    }

    /// Round tick values inside the domain
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = (self.domain.0.min(self.domain.1), self.domain.0.max(self.domain.1));
        breaks::within(&breaks::extended_breaks(lo, hi, count), lo, hi)
    }
}

/// Min and max of the finite values
pub fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Dates mapped linearly by day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    pub domain: (NaiveDate, NaiveDate),
    pub range: (f64, f64),
}

impl TimeScale {
    pub fn new(domain: (NaiveDate, NaiveDate), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn from_dates(dates: impl IntoIterator<Item = NaiveDate>, range: (f64, f64)) -> Option<Self> {
        let mut iter = dates.into_iter();
        let first = iter.next()?;
        let (lo, hi) = iter.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(Self::new((lo, hi), range))
    }

    fn linear(&self) -> LinearScale {
        let span = (self.domain.1 - self.domain.0).num_days() as f64;
        LinearScale::new((0.0, span), self.range)
    }

    pub fn map(&self, date: NaiveDate) -> f64 {
        self.linear().map((date - self.domain.0).num_days() as f64)
    }

    pub fn ticks(&self, count: usize) -> Vec<NaiveDate> {
        breaks::date_breaks(self.domain.0, self.domain.1, count)
    }
}

/// Evenly spaced bands for categories
#[derive(Debug, Clone, PartialEq)]
pub struct BandScale {
    domain: Vec<String>,
    range: (f64, f64),
    padding_inner: f64,
    padding_outer: f64,
    align: f64,
}

impl BandScale {
    pub fn new(domain: Vec<String>, range: (f64, f64)) -> Self {
        Self {
            domain,
            range,
            padding_inner: 0.0,
            padding_outer: 0.0,
            align: 0.5,
        }
    }

    /// Same inner and outer padding, as a fraction of the step
    pub fn padding(mut self, padding: f64) -> Self {
        self.padding_inner = padding.clamp(0.0, 1.0);
        self.padding_outer = padding.max(0.0);
        self
    }

    pub fn padding_inner(mut self, padding: f64) -> Self {
        self.padding_inner = padding.clamp(0.0, 1.0);
        self
    }

    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    pub fn step(&self) -> f64 {
        let n = self.domain.len() as f64;
        let (r0, r1) = self.range;
        (r1 - r0) / (n - self.padding_inner + 2.0 * self.padding_outer).max(1.0)
    }

    pub fn bandwidth(&self) -> f64 {
        self.step() * (1.0 - self.padding_inner)
    }

    fn start(&self) -> f64 {
        let n = self.domain.len() as f64;
        let (r0, r1) = self.range;
        r0 + (r1 - r0 - self.step() * (n - self.padding_inner)) * self.align
    }

    /// Start of the band for `key`
    pub fn position(&self, key: &str) -> Option<f64> {
        let index = self.domain.iter().position(|d| d == key)?;
        Some(self.start() + self.step() * index as f64)
    }

    /// Center of the band for `key`
    pub fn center(&self, key: &str) -> Option<f64> {
        self.position(key).map(|p| p + self.bandwidth() / 2.0)
    }
}

/// An RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }

    /// Relative luminance in `[0, 1]`, for picking label colors
    pub fn luminance(self) -> f64 {
        (0.2126 * self.0 as f64 + 0.7152 * self.1 as f64 + 0.0722 * self.2 as f64) / 255.0
    }
}

/// Piecewise linear interpolation between color stops on `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    stops: Vec<(f64, Rgb)>,
}

impl ColorRamp {
    /// Stops are spread evenly; invalid hex strings are skipped
    pub fn new(colors: &[&str]) -> Self {
        let parsed: Vec<Rgb> = colors.iter().filter_map(|c| Rgb::from_hex(c)).collect();
        let last = parsed.len().saturating_sub(1).max(1) as f64;
        Self {
            stops: parsed
                .into_iter()
                .enumerate()
                .map(|(i, c)| (i as f64 / last, c))
                .collect(),
        }
    }

    pub fn at(&self, t: f64) -> Rgb {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        match self.stops.as_slice() {
            [] => Rgb(0, 0, 0),
            [(_, only)] => *only,
            stops => {
                for pair in stops.windows(2) {
                    let (t0, c0) = pair[0];
                    let (t1, c1) = pair[1];
                    if t <= t1 {
                        let local = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
                        return c0.lerp(c1, local);
                    }
                }
                stops[stops.len() - 1].1
            }
        }
    }
}

/// Continuous values to colors along a ramp
#[derive(Debug, Clone, PartialEq)]
pub struct SequentialColor {
    pub domain: (f64, f64),
    ramp: ColorRamp,
}

impl SequentialColor {
    pub fn new(domain: (f64, f64), ramp: ColorRamp) -> Self {
        Self { domain, ramp }
    }

    pub fn rgb(&self, value: f64) -> Rgb {
        let (lo, hi) = self.domain;
        let t = if hi == lo { 1.0 } else { (value - lo) / (hi - lo) };
        self.ramp.at(t)
    }

    pub fn color(&self, value: f64) -> String {
        self.rgb(value).to_hex()
    }
}

/// Categories to palette colors, cycling when the palette runs out
#[derive(Debug, Clone, PartialEq)]
pub struct OrdinalColor {
    domain: Vec<String>,
    palette: Vec<String>,
}

impl OrdinalColor {
    pub fn new(domain: Vec<String>, palette: &[&str]) -> Self {
        Self {
            domain,
            palette: palette.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    pub fn color(&self, key: &str) -> String {
        if self.palette.is_empty() {
            return "#000000".to_string();
        }
        let index = self.domain.iter().position(|d| d == key).unwrap_or(0);
        self.palette[index % self.palette.len()].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_map_and_invert() {
        let scale = LinearScale::new((0.0, 100.0), (300.0, 0.0));
        assert_eq!(scale.map(0.0), 300.0);
        assert_eq!(scale.map(50.0), 150.0);
        assert_eq!(scale.invert(0.0), 100.0);
    }

    #[test]
    fn test_linear_nice() {
        let scale = LinearScale::new((3.0, 97.0), (0.0, 1.0)).nice(5);
        assert_eq!(scale.domain, (0.0, 100.0));
    }

    #[test]
    fn test_linear_degenerate_domain() {
        let scale = LinearScale::new((5.0, 5.0), (0.0, 10.0));
        assert_eq!(scale.map(5.0), 5.0);
        let niced = scale.nice(5);
        assert_eq!(niced.domain, (0.0, 5.0));
    }

    #[test]
    fn test_ticks_inside_domain() {
        let scale = LinearScale::new((0.0, 240.0), (0.0, 1.0));
        let ticks = scale.ticks(5);
        assert!(ticks.iter().all(|t| *t >= 0.0 && *t <= 240.0));
        assert!(ticks.contains(&0.0));
    }

    #[test]
    fn test_extent_ignores_nan() {
        assert_eq!(extent(vec![3.0, f64::NAN, -1.0, 7.0]), Some((-1.0, 7.0)));
        assert_eq!(extent(Vec::<f64>::new()), None);
    }

    #[test]
    fn test_time_scale() {
        let d = |day| NaiveDate::from_ymd_opt(2018, 12, day).unwrap();
        let scale = TimeScale::from_dates(vec![d(11), d(1), d(21)], (0.0, 200.0)).unwrap();
        assert_eq!(scale.map(d(1)), 0.0);
        assert_eq!(scale.map(d(11)), 100.0);
        assert_eq!(scale.map(d(21)), 200.0);
    }

    #[test]
    fn test_band_scale_matches_d3() {
        // d3.scaleBand().domain(["a","b","c"]).range([0,120]).padding(0.2)
        let scale = BandScale::new(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            (0.0, 120.0),
        )
        .padding(0.2);
        let step = 120.0 / 3.2;
        assert!((scale.step() - step).abs() < 1e-9);
        assert!((scale.bandwidth() - step * 0.8).abs() < 1e-9);
        assert!((scale.position("a").unwrap() - step * 0.2).abs() < 1e-9);
        assert!(scale.position("z").is_none());
    }

    #[test]
    fn test_band_scale_no_padding() {
        let scale = BandScale::new(vec!["x".to_string(), "y".to_string()], (0.0, 100.0));
        assert_eq!(scale.position("x"), Some(0.0));
        assert_eq!(scale.position("y"), Some(50.0));
        assert_eq!(scale.center("y"), Some(75.0));
    }

    #[test]
    fn test_color_ramp() {
        let ramp = ColorRamp::new(&["#000000", "#ffffff"]);
        assert_eq!(ramp.at(0.0), Rgb(0, 0, 0));
        assert_eq!(ramp.at(1.0), Rgb(255, 255, 255));
        assert_eq!(ramp.at(0.5), Rgb(128, 128, 128));
        assert_eq!(ramp.at(7.0), Rgb(255, 255, 255));
    }

    #[test]
    fn test_sequential_color() {
        let scale = SequentialColor::new((0.0, 10.0), ColorRamp::new(&["#ff0000", "#0000ff"]));
        assert_eq!(scale.color(0.0), "#ff0000");
        assert_eq!(scale.color(10.0), "#0000ff");
    }

    #[test]
    fn test_ordinal_color_cycles() {
        let scale = OrdinalColor::new(
            vec!["a".into(), "b".into(), "c".into()],
            &["#111111", "#222222"],
        );
        assert_eq!(scale.color("a"), "#111111");
        assert_eq!(scale.color("c"), "#111111");
    }

    #[test]
    fn test_rgb_hex() {
        assert_eq!(Rgb::from_hex("#0072B2"), Some(Rgb(0, 0x72, 0xb2)));
        assert_eq!(Rgb(0, 0x72, 0xb2).to_hex(), "#0072b2");
        assert_eq!(Rgb::from_hex("0072B2"), None);
    }
}
