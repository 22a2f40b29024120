use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use ckt_sim::{AnnotationKind, SimResults, Simulator, annotate, gen_netlist};
use clap::Args;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use crate::load::{file_name, load_diagram};

#[derive(Args, Debug)]
#[command(about = "Netlist a diagram, run the simulator and print node voltages")]
pub struct SimArgs {
    /// Diagram file (structural JSON)
    #[arg(value_name = "DIAGRAM", value_hint = clap::ValueHint::FilePath)]
    pub path: PathBuf,

    /// Signal source file passed to the simulator
    #[arg(short, long, value_hint = clap::ValueHint::FilePath, required_unless_present = "netlist")]
    pub signal: Option<PathBuf>,

    /// Simulator executable (defaults to $CKT_SIMULATOR, then `csim` on PATH)
    #[arg(long, value_hint = clap::ValueHint::ExecutablePath)]
    pub simulator: Option<PathBuf>,

    /// Kill the simulator after this many seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Print the netlist to stdout (skip running the simulator)
    #[arg(long)]
    pub netlist: bool,

    /// Show full simulator output on success
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn execute(args: SimArgs) -> Result<()> {
    let name = file_name(&args.path);
    let mut diagram = load_diagram(&args.path)?;

    let mut buf: Vec<u8> = Vec::new();
    let labeling = gen_netlist(&mut diagram, &mut buf)
        .with_context(|| format!("Netlist generation failed for {name}"))?;
    for conflict in &labeling.conflicts {
        eprintln!("{} {name}: {conflict}", "Warning:".yellow().bold());
    }

    if args.netlist {
        std::io::stdout().write_all(&buf)?;
        return Ok(());
    }
    let Some(signal) = &args.signal else {
        bail!("--signal is required to run a simulation");
    };

    let simulator =
        Simulator::locate(args.simulator.as_deref())?.with_timeout(Duration::from_secs(args.timeout));

    let scratch = tempfile::Builder::new().prefix("ckt-sim").tempdir()?;
    let netlist_path = scratch.path().join("circuit.txt");
    let output_path = scratch.path().join("results.txt");
    std::fs::write(&netlist_path, &buf)
        .with_context(|| format!("Failed to write {}", netlist_path.display()))?;

    let output = simulator.run(&netlist_path, &signal.to_string_lossy(), &output_path)?;
    if !output.success {
        eprint!("{}", output.stdout);
        eprint!("{}", output.stderr);
        bail!("Simulation failed for {name}");
    }
    if args.verbose {
        print!("{}", output.stdout);
    }

    let results = SimResults::read(&output_path)?;
    let annotations = annotate(&diagram, &results);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Node", "Location", "Value"]);
    for annotation in &annotations {
        let color = match annotation.kind {
            AnnotationKind::Voltage => Color::Green,
            AnnotationKind::Current => Color::Cyan,
        };
        table.add_row(vec![
            Cell::new(&annotation.label),
            Cell::new(annotation.location),
            Cell::new(&annotation.text).fg(color),
        ]);
    }
    println!("{table}");
    eprintln!(
        "{} {name}: {} result(s) from {}",
        "✓".green(),
        results.len(),
        simulator.program().display()
    );
    Ok(())
}
