use std::fmt;

/// CSS `hsla()` fill color. Saturation and lightness are percentages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsla {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
    pub alpha: f64,
}

const FILL_ALPHA: f64 = 0.3;

/// Yellow used whenever a value cannot be placed on the gradient.
pub const NEUTRAL: Hsla = Hsla {
    hue: 49.0,
    saturation: 100.0,
    lightness: 50.0,
    alpha: FILL_ALPHA,
};

impl Hsla {
    pub fn from_hue(hue: f64) -> Self {
        Hsla { hue, ..NEUTRAL }
    }
}

impl fmt::Display for Hsla {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsla({}, {}%, {}%, {})",
            self.hue, self.saturation, self.lightness, self.alpha
        )
    }
}

/// Green (120) at 0.0 through red (0) at 1.0.
/// Out of range input is clamped and NaN falls back to `NEUTRAL`.
pub fn percentage_to_hsla(percentage: f64) -> Hsla {
    if percentage.is_nan() {
        return NEUTRAL;
    }
    let percentage = percentage.clamp(0.0, 1.0);
    Hsla::from_hue(percentage * -120.0 + 120.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_endpoints() {
        assert_eq!(percentage_to_hsla(0.0).hue, 120.0);
        assert_eq!(percentage_to_hsla(1.0).hue, 0.0);
        assert_eq!(percentage_to_hsla(0.5).hue, 60.0);
    }

    #[test]
    fn formats_as_css() {
        assert_eq!(percentage_to_hsla(0.0).to_string(), "hsla(120, 100%, 50%, 0.3)");
        assert_eq!(NEUTRAL.to_string(), "hsla(49, 100%, 50%, 0.3)");
    }

    #[test]
    fn clamps_and_guards_nan() {
        assert_eq!(percentage_to_hsla(1.5).hue, 0.0);
        assert_eq!(percentage_to_hsla(-0.25).hue, 120.0);
        assert_eq!(percentage_to_hsla(f64::NAN), NEUTRAL);
    }
}
