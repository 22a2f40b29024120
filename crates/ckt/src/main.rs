use clap::{Parser, Subcommand};
use colored::Colorize;
use env_logger::Env;

mod check;
mod clean;
mod load;
mod netlist;
mod parts;
mod sim;

#[derive(Parser)]
#[command(name = "ckt")]
#[command(about = "Circuit diagram checker, netlister and simulator front end", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the netlist of a diagram
    #[command(alias = "n")]
    Netlist(netlist::NetlistArgs),

    /// Audit a diagram for label conflicts and broken topology
    #[command(alias = "c")]
    Check(check::CheckArgs),

    /// Merge collinear wires
    Clean(clean::CleanArgs),

    /// Run the external simulator on a diagram
    Sim(sim::SimArgs),

    /// List the available parts
    Parts(parts::PartsArgs),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e}", "Error:".red());
        for cause in e.chain().skip(1) {
            eprintln!("  {cause}");
        }
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Default level depends on --debug, RUST_LOG still wins
    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("error")
    };
    env_logger::Builder::from_env(env).init();

    match cli.command {
        Commands::Netlist(args) => netlist::execute(args),
        Commands::Check(args) => check::execute(args),
        Commands::Clean(args) => clean::execute(args),
        Commands::Sim(args) => sim::execute(args),
        Commands::Parts(args) => parts::execute(args),
    }
}
