use super::AnimationValue;

/// An animation endpoint in a form that can be blended
#[derive(Debug, Clone, PartialEq)]
pub enum Interpolatable {
    Number(f64),
    /// Number with a unit suffix such as `px` or `%`
    Dimension { value: f64, unit: String },
    /// `#rrggbb`
    Color([u8; 3]),
}

impl Interpolatable {
    pub fn parse(value: &AnimationValue) -> Option<Self> {
        match value {
            AnimationValue::Number(n) if n.is_finite() => Some(Interpolatable::Number(*n)),
            AnimationValue::Number(_) => None,
            AnimationValue::Text(text) => Self::parse_str(text),
        }
    }

    fn parse_str(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            return parse_hex_color(hex).map(Interpolatable::Color);
        }

        let split = numeric_prefix_len(text);
        if split == 0 {
            return None;
        }
        let value: f64 = text[..split].parse().ok()?;
        let unit = &text[split..];
        if unit.is_empty() {
            Some(Interpolatable::Number(value))
        } else {
            Some(Interpolatable::Dimension {
                value,
                unit: unit.to_string(),
            })
        }
    }

    /// Whether the two endpoints can be blended into each other
    pub fn compatible(&self, other: &Interpolatable) -> bool {
        matches!(
            (self, other),
            (Interpolatable::Color(_), Interpolatable::Color(_))
                | (
                    Interpolatable::Number(_) | Interpolatable::Dimension { .. },
                    Interpolatable::Number(_) | Interpolatable::Dimension { .. }
                )
        )
    }

    /// Blend towards `to` by `progress` and format the result. Mixed numeric
    /// kinds take the unit of whichever endpoint has one, preferring `to`.
    pub fn interpolate(&self, to: &Interpolatable, progress: f64) -> Option<String> {
        match (self, to) {
            (Interpolatable::Color(a), Interpolatable::Color(b)) => {
                let mut out = [0u8; 3];
                for (channel, (x, y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
                    let blended = lerp(f64::from(*x), f64::from(*y), progress).round();
                    *channel = blended.clamp(0.0, 255.0) as u8;
                }
                Some(format!("#{:02x}{:02x}{:02x}", out[0], out[1], out[2]))
            }
            (Interpolatable::Color(_), _) | (_, Interpolatable::Color(_)) => None,
            _ => {
                let value = lerp(self.magnitude(), to.magnitude(), progress);
                let unit = to.unit().or_else(|| self.unit()).unwrap_or("");
                Some(format!("{}{}", format_number(value), unit))
            }
        }
    }

    fn magnitude(&self) -> f64 {
        match self {
            Interpolatable::Number(v) | Interpolatable::Dimension { value: v, .. } => *v,
            Interpolatable::Color(_) => 0.0,
        }
    }

    fn unit(&self) -> Option<&str> {
        match self {
            Interpolatable::Dimension { unit, .. } => Some(unit.as_str()),
            _ => None,
        }
    }
}

pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Format a number the way attribute values expect: no trailing `.0`, at most
/// three decimals.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    format!("{}", rounded)
}

fn numeric_prefix_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut idx = 0;
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        idx += 1;
    }
    let digits_start = idx;
    let mut seen_dot = false;
    while let Some(b) = bytes.get(idx) {
        match b {
            b'0'..=b'9' => idx += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                idx += 1;
            }
            _ => break,
        }
    }
    let digits = &text[digits_start..idx];
    if digits.bytes().any(|b| b.is_ascii_digit()) {
        idx
    } else {
        0
    }
}

fn parse_hex_color(hex: &str) -> Option<[u8; 3]> {
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(v: &str) -> AnimationValue {
        AnimationValue::Text(v.to_string())
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!(
            Interpolatable::parse(&AnimationValue::Number(1.5)),
            Some(Interpolatable::Number(1.5))
        );
        assert_eq!(Interpolatable::parse(&text("0.25")), Some(Interpolatable::Number(0.25)));
        assert_eq!(
            Interpolatable::parse(&text("-10px")),
            Some(Interpolatable::Dimension {
                value: -10.0,
                unit: "px".to_string()
            })
        );
        assert_eq!(
            Interpolatable::parse(&text("#ff8000")),
            Some(Interpolatable::Color([255, 128, 0]))
        );
        assert_eq!(Interpolatable::parse(&text("auto")), None);
        assert_eq!(Interpolatable::parse(&text("#fff")), None);
        assert_eq!(Interpolatable::parse(&text(".")), None);
    }

    #[test]
    fn test_interpolate_dimension_keeps_unit() {
        let from = Interpolatable::parse(&text("0px")).unwrap();
        let to = Interpolatable::parse(&text("100px")).unwrap();
        assert_eq!(from.interpolate(&to, 0.25).as_deref(), Some("25px"));
    }

    #[test]
    fn test_interpolate_mixed_numeric_takes_unit() {
        let from = Interpolatable::Number(0.0);
        let to = Interpolatable::parse(&text("50%")).unwrap();
        assert_eq!(from.interpolate(&to, 0.5).as_deref(), Some("25%"));
    }

    #[test]
    fn test_interpolate_color_per_channel() {
        let from = Interpolatable::Color([0, 0, 0]);
        let to = Interpolatable::Color([255, 100, 10]);
        assert_eq!(from.interpolate(&to, 0.5).as_deref(), Some("#803205"));
    }

    #[test]
    fn test_color_and_number_are_incompatible() {
        let color = Interpolatable::Color([0, 0, 0]);
        let number = Interpolatable::Number(1.0);
        assert!(!color.compatible(&number));
        assert_eq!(color.interpolate(&number, 0.5), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(1.0 / 3.0), "0.333");
        assert_eq!(format_number(-0.0001), "0");
    }
}
