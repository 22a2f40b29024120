use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};

/// Simulator output: node and branch labels mapped to values.
///
/// The file format is one `label value` pair per line. Blank lines and lines
/// starting with `#` are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimResults {
    values: BTreeMap<String, f64>,
}

impl SimResults {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read simulator output {}", path.display()))?;
        text.parse()
            .with_context(|| format!("Failed to parse simulator output {}", path.display()))
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.values.get(label).copied()
    }

    /// Branch current through the voltage source named `name`.
    pub fn current(&self, name: &str) -> Option<f64> {
        self.get(&format!("I({name})"))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn insert(&mut self, label: impl Into<String>, value: f64) {
        self.values.insert(label.into(), value);
    }
}

impl FromStr for SimResults {
    type Err = anyhow::Error;

    fn from_str(text: &str) -> Result<Self> {
        let mut results = SimResults::default();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(label), Some(value), None) = (parts.next(), parts.next(), parts.next())
            else {
                return Err(anyhow!("line {}: expected 'label value'", number + 1));
            };
            let value: f64 = value
                .parse()
                .map_err(|_| anyhow!("line {}: '{value}' is not a number", number + 1))?;
            results.insert(label, value);
        }
        Ok(results)
    }
}
