use std::path::PathBuf;

use anyhow::{Result, bail};
use ckt_sch::Violation;
use clap::Args;
use colored::Colorize;
use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets};
use itertools::Itertools;

use crate::load::{file_name, load_diagram};

#[derive(Args, Debug)]
#[command(about = "Report part counts, label conflicts and topology violations")]
pub struct CheckArgs {
    /// Diagram file (structural JSON)
    #[arg(value_name = "DIAGRAM", value_hint = clap::ValueHint::FilePath)]
    pub path: PathBuf,
}

pub fn execute(args: CheckArgs) -> Result<()> {
    let mut diagram = load_diagram(&args.path)?;
    let name = file_name(&args.path);

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Part").add_attribute(Attribute::Bold),
            Cell::new("Count").add_attribute(Attribute::Bold),
        ]);
    for (kind, count) in diagram
        .components()
        .map(|(_, c)| c.kind())
        .counts()
        .into_iter()
        .sorted()
    {
        table.add_row(vec![kind.to_string(), count.to_string()]);
    }
    println!("{table}");

    let labeling = diagram.label_connection_points();
    println!(
        "{} nodes labeled, {} locations",
        labeling.minted,
        diagram.location_count()
    );
    for conflict in &labeling.conflicts {
        eprintln!("{} {conflict}", "Warning:".yellow().bold());
    }

    let (structural, untidy): (Vec<Violation>, Vec<Violation>) = diagram
        .check_invariants()
        .into_iter()
        .partition(Violation::is_structural);
    for violation in &untidy {
        eprintln!(
            "{} {violation} (run `ckt clean`)",
            "Warning:".yellow().bold()
        );
    }
    for violation in &structural {
        eprintln!("{} {violation}", "Violation:".red().bold());
    }
    if !structural.is_empty() {
        bail!("{name}: {} topology violation(s)", structural.len());
    }

    println!("{} {name}", "✓".green());
    Ok(())
}
