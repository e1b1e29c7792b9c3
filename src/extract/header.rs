//! Bias values encoded in column headers.

use crate::config::family::BiasVar;
use crate::error::{MeasError, Result};

/// The header of a sub-table's first column, e.g. `"vds=0.05/vbs sweep"`.
///
/// The header is split on `/`; its first segment must be `<label>=<value>`.
/// Later segments of the same shape are kept, anything else is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct BiasHeader {
    pairs: Vec<(String, f64)>,
}

impl BiasHeader {
    pub fn parse(header: &str) -> Result<Self> {
        let mut segments = header.split('/');
        let first = segments
            .next()
            .and_then(parse_pair)
            .ok_or_else(|| MeasError::Format {
                header: header.to_string(),
            })?;

        let mut pairs = vec![first];
        pairs.extend(segments.filter_map(parse_pair));
        Ok(Self { pairs })
    }

    pub fn find(&self, var: BiasVar) -> Option<f64> {
        self.pairs
            .iter()
            .find(|(label, _)| label_is(label, var))
            .map(|(_, value)| *value)
    }

    /// The value labelled `var`, or the first value when no segment names it.
    pub fn value_of(&self, var: BiasVar) -> f64 {
        self.find(var).unwrap_or(self.pairs[0].1)
    }
}

/// Parses a stacked column label such as `"vbs =-0.825"`.
pub fn parse_step_label(label: &str) -> Option<(String, f64)> {
    parse_pair(label)
}

pub(crate) fn label_is(label: &str, var: BiasVar) -> bool {
    label
        .trim()
        .trim_start_matches('-')
        .eq_ignore_ascii_case(var.as_str())
}

fn parse_pair(segment: &str) -> Option<(String, f64)> {
    let (label, value) = segment.split_once('=')?;
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    Some((label.to_string(), parse_value(value)?))
}

fn parse_value(value: &str) -> Option<f64> {
    let value = value.trim();
    value.parse().ok().or_else(|| {
        // De-duplicated headers carry a trailing `.N`, e.g. `1.5.2`.
        let mut parts = value.splitn(3, '.');
        let whole = parts.next()?;
        let frac = parts.next()?;
        parts.next()?;
        format!("{whole}.{frac}").parse().ok()
    })
}
