use std::fmt;

use anyhow::Result;
use ckt_sch::PartKind;
use clap::{Args, ValueEnum};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use itertools::Itertools;
use serde_json::json;

#[derive(ValueEnum, Debug, Clone, Default)]
pub enum PartsFormat {
    #[default]
    Table,
    Json,
}

impl fmt::Display for PartsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartsFormat::Table => write!(f, "table"),
            PartsFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Args, Debug, Clone)]
#[command(about = "List the part palette")]
pub struct PartsArgs {
    /// Output format
    #[arg(short, long, default_value_t = PartsFormat::Table)]
    pub format: PartsFormat,
}

fn defaults(kind: PartKind) -> String {
    kind.schema()
        .defaults
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .join(" ")
}

pub fn execute(args: PartsArgs) -> Result<()> {
    match args.format {
        PartsFormat::Json => {
            let parts: Vec<_> = PartKind::palette()
                .map(|kind| {
                    let schema = kind.schema();
                    let defaults: serde_json::Map<String, serde_json::Value> = schema
                        .defaults
                        .iter()
                        .map(|(key, value)| (key.to_string(), json!(value)))
                        .collect();
                    json!({
                        "tag": schema.tag,
                        "description": schema.description,
                        "terminals": schema.offsets.len(),
                        "keyword": schema.keyword,
                        "defaults": defaults,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&parts)?);
        }
        PartsFormat::Table => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL_CONDENSED);
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Tag", "Part", "Terminals", "Netlist", "Defaults"]);
            for kind in PartKind::palette() {
                let schema = kind.schema();
                table.add_row(vec![
                    schema.tag.to_string(),
                    schema.description.to_string(),
                    schema.offsets.len().to_string(),
                    schema.keyword.unwrap_or("-").to_string(),
                    defaults(kind),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
