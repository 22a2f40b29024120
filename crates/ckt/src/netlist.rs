use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use ckt_sim::gen_netlist;
use clap::Args;
use colored::Colorize;

use crate::load::{file_name, load_diagram};

#[derive(Args, Debug)]
#[command(about = "Label a diagram and print its netlist")]
pub struct NetlistArgs {
    /// Diagram file (structural JSON)
    #[arg(value_name = "DIAGRAM", value_hint = clap::ValueHint::FilePath)]
    pub path: PathBuf,

    /// Write the netlist to a file instead of stdout
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

pub fn execute(args: NetlistArgs) -> Result<()> {
    let mut diagram = load_diagram(&args.path)?;

    let labeling = match &args.output {
        Some(output) => {
            let file = File::create(output)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            let mut writer = BufWriter::new(file);
            let labeling = gen_netlist(&mut diagram, &mut writer)?;
            writer.flush()?;
            labeling
        }
        None => gen_netlist(&mut diagram, &mut std::io::stdout().lock())?,
    };

    let name = file_name(&args.path);
    for conflict in &labeling.conflicts {
        eprintln!("{} {name}: {conflict}", "Warning:".yellow().bold());
    }
    if let Some(output) = &args.output {
        eprintln!(
            "{} Wrote netlist for {name} to {}",
            "✓".green(),
            output.display()
        );
    }
    Ok(())
}
