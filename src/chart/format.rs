//! Number formatting for labels and tooltips

/// Compact SI form: `950`, `12k`, `1.5M`
pub fn si(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e9 {
        (value / 1e9, "G")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "k")
    } else {
        (value, "")
    };
    format!("{}{}", trim_decimals(scaled, 1), suffix)
}

/// Fixed decimals with trailing zeros removed
pub fn trim_decimals(value: f64, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, value);
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    };
    if text == "-0" {
        "0".to_string()
    } else {
        text
    }
}

/// Integer with thousands separators
pub fn grouped(value: f64) -> String {
    crate::diagnostics::thousands(value)
}

/// Share of a whole as `12.3%`
pub fn percent(part: f64, whole: f64) -> String {
    if whole == 0.0 || !whole.is_finite() {
        return "0%".to_string();
    }
    format!("{}%", trim_decimals(part / whole * 100.0, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_si() {
        assert_eq!(si(950.0), "950");
        assert_eq!(si(12_000.0), "12k");
        assert_eq!(si(1_500_000.0), "1.5M");
        assert_eq!(si(-2_000.0), "-2k");
        assert_eq!(si(0.5), "0.5");
    }

    #[test]
    fn test_trim_decimals() {
        assert_eq!(trim_decimals(2.50, 2), "2.5");
        assert_eq!(trim_decimals(3.0, 2), "3");
        assert_eq!(trim_decimals(-0.001, 1), "0");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1.0, 4.0), "25%");
        assert_eq!(percent(1.0, 3.0), "33.3%");
        assert_eq!(percent(1.0, 0.0), "0%");
    }
}
