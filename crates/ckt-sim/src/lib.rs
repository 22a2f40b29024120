use std::io::Write;

use anyhow::{Context, Result};
use ckt_sch::{Diagram, Labeling, write_netlist};

mod annotate;
mod results;
mod simulator;

pub use annotate::{Annotation, AnnotationKind, annotate};
pub use results::SimResults;
pub use simulator::{DEFAULT_TIMEOUT, SIMULATOR_ENV, SimulationOutput, Simulator};

/// Labels `diagram` and writes its netlist to `out`.
pub fn gen_netlist(diagram: &mut Diagram, out: &mut impl Write) -> Result<Labeling> {
    let (rows, labeling) = diagram.netlist().context("Failed to build netlist")?;
    for conflict in &labeling.conflicts {
        log::warn!("Netlist may be inconsistent: {conflict}");
    }
    write_netlist(&rows, out).context("Failed to write netlist")?;
    Ok(labeling)
}
