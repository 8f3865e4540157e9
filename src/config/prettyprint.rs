// (c) 2025 Ross Younger
//! Configuration pretty-printing

use std::fmt::Display;

use figment::{value::Value, Metadata};
use tabled::{settings::style::Style, Table, Tabled};

use super::{structure::FIELD_NAMES, Manager};

#[derive(Tabled)]
struct PrettyConfig {
    field: String,
    value: String,
    source: String,
}

impl PrettyConfig {
    fn render_source(meta: Option<&Metadata>) -> String {
        meta.map(|m| {
            m.source
                .as_ref()
                .map_or_else(|| m.name.to_string(), figment::Source::to_string)
        })
        .unwrap_or_default()
    }

    fn render_value(value: &Value) -> String {
        match value {
            Value::String(_tag, s) => s.to_string(),
            Value::Char(_tag, c) => c.to_string(),
            Value::Bool(_tag, b) => b.to_string(),
            Value::Num(_tag, num) => num
                .to_i128()
                .map(|i| i.to_string())
                .or_else(|| num.to_u128().map(|u| u.to_string()))
                .or_else(|| num.to_f64().map(|f| f.to_string()))
                .unwrap_or_default(),
            Value::Empty(_tag, _) => "<empty>".into(),
            Value::Dict(_tag, _) => "<table>".into(),
            Value::Array(_tag, vec) => format!(
                "[{}]",
                vec.iter()
                    .map(PrettyConfig::render_value)
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        }
    }
}

/// Pretty-printing wrapper for [`Manager`], showing each field's value and where it came from
#[derive(Debug)]
pub struct DisplayAdapter<'a> {
    source: &'a Manager,
}

impl Manager {
    /// Creates an ephemeral structure implementing `Display`
    #[must_use]
    pub fn to_display_adapter(&self) -> DisplayAdapter<'_> {
        DisplayAdapter { source: self }
    }
}

impl Display for DisplayAdapter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = &self.source.data;
        let rows = FIELD_NAMES.iter().filter_map(|field| {
            let value = data.find_value(field).ok()?;
            Some(PrettyConfig {
                field: (*field).to_string(),
                value: PrettyConfig::render_value(&value),
                source: PrettyConfig::render_source(data.get_metadata(value.tag())),
            })
        });
        let mut table = Table::new(rows);
        let _ = table.with(Style::sharp());
        write!(f, "{table}")
    }
}
