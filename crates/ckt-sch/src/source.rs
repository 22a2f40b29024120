//! Source waveform descriptors such as `dc(1)`, `sin(0,1,1k)` or `pwl(0,0,1m,5)`.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Dc,
    Impulse,
    Step,
    Square,
    Triangle,
    Pwl,
    PwlRepeating,
    Pulse,
    Sin,
}

impl SourceKind {
    pub const ALL: [SourceKind; 9] = [
        SourceKind::Dc,
        SourceKind::Impulse,
        SourceKind::Step,
        SourceKind::Square,
        SourceKind::Triangle,
        SourceKind::Pwl,
        SourceKind::PwlRepeating,
        SourceKind::Pulse,
        SourceKind::Sin,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Dc => "dc",
            SourceKind::Impulse => "impulse",
            SourceKind::Step => "step",
            SourceKind::Square => "square",
            SourceKind::Triangle => "triangle",
            SourceKind::Pwl => "pwl",
            SourceKind::PwlRepeating => "pwl_repeating",
            SourceKind::Pulse => "pulse",
            SourceKind::Sin => "sin",
        }
    }

    /// Labels of the positional parameters, as shown in a property form.
    pub fn parameters(self) -> &'static [&'static str] {
        match self {
            SourceKind::Dc => &["DC value"],
            SourceKind::Impulse => &["Height", "Width (secs)"],
            SourceKind::Step => &[
                "Initial value",
                "Plateau value",
                "Delay until step (secs)",
                "Rise time (secs)",
            ],
            SourceKind::Square | SourceKind::Triangle => {
                &["Initial value", "Plateau value", "Frequency (Hz)"]
            }
            SourceKind::Pwl | SourceKind::PwlRepeating => {
                &["Comma-separated list of alternating times and values"]
            }
            SourceKind::Pulse => &[
                "Initial value",
                "Plateau value",
                "Delay until pulse (secs)",
                "Time for first transition (secs)",
                "Time for second transition (secs)",
                "Pulse width (secs)",
                "Period (secs)",
            ],
            SourceKind::Sin => &[
                "Offset value",
                "Amplitude",
                "Frequency (Hz)",
                "Delay until sin starts (secs)",
                "Phase offset (degrees)",
            ],
        }
    }

    /// Piecewise-linear kinds take a variable-length list of time/value pairs.
    pub fn is_piecewise(self) -> bool {
        matches!(self, SourceKind::Pwl | SourceKind::PwlRepeating)
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::InvalidSource {
                descriptor: s.to_string(),
                reason: format!("unknown source function '{s}'"),
            })
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed `name(arg,arg,...)` descriptor. Arguments keep their original
/// text so that engineering suffixes survive a round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFunction {
    pub kind: SourceKind,
    pub args: Vec<String>,
}

impl SourceFunction {
    pub fn new(kind: SourceKind, args: Vec<String>) -> Result<Self> {
        let function = Self { kind, args };
        function.validate()?;
        Ok(function)
    }

    pub fn values(&self) -> Result<Vec<f64>> {
        self.args.iter().map(|arg| parse_number(arg)).collect()
    }

    /// One `(label, value)` pair per form field. Piecewise kinds collapse
    /// their arguments into a single comma-separated field.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let labels = self.kind.parameters();
        if self.kind.is_piecewise() {
            return vec![(labels[0], self.args.join(","))];
        }
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| (*label, self.args.get(i).cloned().unwrap_or_default()))
            .collect()
    }

    /// Rebuilds a descriptor from form field values, in the order produced
    /// by [`SourceFunction::form_fields`]. Trailing empty fields are dropped.
    pub fn from_form(kind: SourceKind, fields: &[String]) -> Result<Self> {
        let mut args: Vec<String> = if kind.is_piecewise() {
            fields
                .iter()
                .flat_map(|field| field.split(','))
                .map(|arg| arg.trim().to_string())
                .filter(|arg| !arg.is_empty())
                .collect()
        } else {
            fields.iter().map(|field| field.trim().to_string()).collect()
        };
        while args.last().is_some_and(|arg| arg.is_empty()) {
            args.pop();
        }
        Self::new(kind, args)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidSource {
            descriptor: self.to_string(),
            reason,
        };
        if self.kind.is_piecewise() {
            if self.args.len() % 2 != 0 {
                return Err(invalid("expected alternating times and values".into()));
            }
        } else if self.args.len() > self.kind.parameters().len() {
            return Err(invalid(format!(
                "{} takes at most {} arguments",
                self.kind,
                self.kind.parameters().len()
            )));
        }
        for arg in &self.args {
            if arg.is_empty() {
                return Err(invalid("empty argument".into()));
            }
            parse_number(arg).map_err(|_| invalid(format!("'{arg}' is not a number")))?;
        }
        Ok(())
    }
}

impl FromStr for SourceFunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidSource {
            descriptor: s.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = s.trim();
        let (name, rest) = trimmed
            .split_once('(')
            .ok_or_else(|| invalid("expected name(args)"))?;
        let body = rest
            .strip_suffix(')')
            .ok_or_else(|| invalid("missing closing parenthesis"))?;
        let kind: SourceKind = name.trim().parse()?;
        let args = if body.trim().is_empty() {
            Vec::new()
        } else {
            body.split(',').map(|arg| arg.trim().to_string()).collect()
        };
        Self::new(kind, args)
    }
}

impl fmt::Display for SourceFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.args.iter().join(","))
    }
}

const SUFFIXES: &[(&str, f64)] = &[
    ("meg", 1e6),
    ("t", 1e12),
    ("g", 1e9),
    ("k", 1e3),
    ("m", 1e-3),
    ("u", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
];

/// Parses a number with an optional engineering suffix (`1k`, `4.7u`,
/// `2meg`). Suffixes are case-insensitive as in SPICE, so `M` means milli.
/// Trailing unit letters are ignored: `10uF` is `1e-5`.
pub fn parse_number(text: &str) -> Result<f64> {
    let invalid = || Error::InvalidNumber(text.to_string());
    let s = text.trim();
    let split = numeric_prefix_len(s);
    if split == 0 {
        return Err(invalid());
    }
    let value: f64 = s[..split].parse().map_err(|_| invalid())?;
    let rest = s[split..].to_ascii_lowercase();
    if !rest.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }
    let scale = SUFFIXES
        .iter()
        .find(|(suffix, _)| rest.starts_with(suffix))
        .map_or(1.0, |(_, scale)| *scale);
    Ok(value * scale)
}

fn numeric_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut mantissa_digits = i - digits_start;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let fraction_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        mantissa_digits += i - fraction_start;
    }
    if mantissa_digits == 0 {
        return 0;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exponent_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exponent_start {
            i = j;
        }
    }
    i
}

const PREFIXES: &[(i32, &str)] = &[
    (12, "T"),
    (9, "G"),
    (6, "meg"),
    (3, "k"),
    (0, ""),
    (-3, "m"),
    (-6, "u"),
    (-9, "n"),
    (-12, "p"),
    (-15, "f"),
];

/// Formats a value with an engineering suffix and `digits` significant
/// digits. The output is accepted by [`parse_number`].
pub fn format_engineering(value: f64, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    let digits = digits.max(1);
    let scientific = format!("{:.*e}", digits - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let (Ok(mantissa), Ok(exponent)) = (mantissa.parse::<f64>(), exponent.parse::<i32>()) else {
        return scientific;
    };
    let group = (exponent.div_euclid(3) * 3).clamp(-15, 12);
    let shift = exponent - group;
    let scaled = mantissa * 10f64.powi(shift);
    let decimals = (digits as i32 - 1 - shift).max(0) as usize;
    let mut text = format!("{scaled:.decimals$}");
    if text.contains('.') {
        text = text.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    let suffix = PREFIXES
        .iter()
        .find(|(e, _)| *e == group)
        .map_or("", |(_, suffix)| *suffix);
    format!("{text}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_descriptor() {
        let f: SourceFunction = "sin(0, 1, 1k)".parse().unwrap();
        assert_eq!(f.kind, SourceKind::Sin);
        assert_eq!(f.args, vec!["0", "1", "1k"]);
        assert_eq!(f.to_string(), "sin(0,1,1k)");
        assert_eq!(f.values().unwrap(), vec![0.0, 1.0, 1000.0]);
    }

    #[test]
    fn test_parse_empty_args() {
        let f: SourceFunction = "dc()".parse().unwrap();
        assert!(f.args.is_empty());
        assert_eq!(f.to_string(), "dc()");
    }

    #[test]
    fn test_reject_bad_descriptors() {
        assert!("dc".parse::<SourceFunction>().is_err());
        assert!("dc(1".parse::<SourceFunction>().is_err());
        assert!("ramp(1)".parse::<SourceFunction>().is_err());
        assert!("dc(1,2)".parse::<SourceFunction>().is_err());
        assert!("pwl(0,1,2)".parse::<SourceFunction>().is_err());
        assert!("step(0,,1)".parse::<SourceFunction>().is_err());
        assert!("dc(volts)".parse::<SourceFunction>().is_err());
    }

    #[test]
    fn test_form_fields_fixed() {
        let f: SourceFunction = "square(0,5)".parse().unwrap();
        let fields = f.form_fields();
        assert_eq!(
            fields,
            vec![
                ("Initial value", "0".to_string()),
                ("Plateau value", "5".to_string()),
                ("Frequency (Hz)", String::new()),
            ]
        );
        let values: Vec<String> = fields.into_iter().map(|(_, v)| v).collect();
        let back = SourceFunction::from_form(SourceKind::Square, &values).unwrap();
        assert_eq!(back, f);
    }

    #[test]
    fn test_form_fields_piecewise() {
        let f: SourceFunction = "pwl(0,0,1m,5)".parse().unwrap();
        let fields = f.form_fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].1, "0,0,1m,5");
        let back =
            SourceFunction::from_form(SourceKind::Pwl, &["0, 0, 1m , 5".to_string()]).unwrap();
        assert_eq!(back, f);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("1").unwrap(), 1.0);
        assert_eq!(parse_number("-2.5").unwrap(), -2.5);
        assert_eq!(parse_number("1e3").unwrap(), 1000.0);
        assert_eq!(parse_number("4k").unwrap(), 4000.0);
        assert_eq!(parse_number("2meg").unwrap(), 2e6);
        assert_eq!(parse_number("3M").unwrap(), 3e-3);
        assert_eq!(parse_number(".5").unwrap(), 0.5);
        assert!((parse_number("10uF").unwrap() - 1e-5).abs() < 1e-20);
        assert!((parse_number("1p").unwrap() - 1e-12).abs() < 1e-24);
        assert!(parse_number("k").is_err());
        assert!(parse_number("").is_err());
        assert!(parse_number("1k2").is_err());
    }

    #[test]
    fn test_format_engineering() {
        assert_eq!(format_engineering(1500.0, 3), "1.5k");
        assert_eq!(format_engineering(0.00247, 3), "2.47m");
        assert_eq!(format_engineering(-1e-6, 3), "-1u");
        assert_eq!(format_engineering(0.0, 3), "0");
        assert_eq!(format_engineering(2e6, 3), "2meg");
        assert_eq!(format_engineering(12.0, 3), "12");
    }

    #[test]
    fn test_format_is_parseable() {
        for value in [1.5e3, 2.2e-9, 4.7e6, -3.3e-3] {
            let text = format_engineering(value, 3);
            let back = parse_number(&text).unwrap();
            assert!((back - value).abs() <= value.abs() * 1e-9, "{text}");
        }
    }
}
