use std::io::Write;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use clap::Args;
use colored::Colorize;

use crate::load::{file_name, load_diagram};

#[derive(Args, Debug)]
#[command(about = "Merge collinear wires and print or rewrite the diagram")]
pub struct CleanArgs {
    /// Diagram file (structural JSON)
    #[arg(value_name = "DIAGRAM", value_hint = clap::ValueHint::FilePath)]
    pub path: PathBuf,

    /// Rewrite the file in place instead of printing it
    #[arg(short, long)]
    pub write: bool,
}

pub fn execute(args: CleanArgs) -> Result<()> {
    let mut diagram = load_diagram(&args.path)?;
    let merged = diagram.clean_up_wires();
    let json = diagram.to_json_string_pretty()?;

    if !args.write {
        println!("{json}");
        return Ok(());
    }

    AtomicFile::new(&args.path, OverwriteBehavior::AllowOverwrite)
        .write(|f| {
            f.write_all(json.as_bytes())?;
            f.write_all(b"\n")?;
            f.flush()
        })
        .map_err(|err| anyhow!("Failed to write {}: {err}", args.path.display()))?;
    eprintln!(
        "{} {}: merged {merged} wire pair(s)",
        "✓".green(),
        file_name(&args.path)
    );
    Ok(())
}
