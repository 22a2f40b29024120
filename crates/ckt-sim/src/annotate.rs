use std::collections::BTreeSet;

use ckt_sch::{Diagram, Location, PartKind, format_engineering};

use crate::results::SimResults;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    Voltage,
    Current,
}

/// A result value pinned to a grid location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub location: Location,
    pub label: String,
    pub text: String,
    pub kind: AnnotationKind,
}

/// Node voltages (once per label, at the first location carrying it) followed
/// by branch currents of voltage sources. Labels missing from `results` are
/// skipped. Returns nothing when the diagram changed since it was last
/// labeled, since the results no longer describe it.
pub fn annotate(diagram: &Diagram, results: &SimResults) -> Vec<Annotation> {
    if !diagram.labels_current() {
        log::debug!("Labels are stale, skipping annotations");
        return Vec::new();
    }

    let mut seen = BTreeSet::new();
    let mut annotations = Vec::new();

    for (location, points) in diagram.locations() {
        let Some(label) = points
            .first()
            .and_then(|p| diagram.connection_point(*p))
            .and_then(|p| p.label())
        else {
            continue;
        };
        if !seen.insert(label) {
            continue;
        }
        if let Some(volts) = results.get(label) {
            annotations.push(Annotation {
                location,
                label: label.to_string(),
                text: format!("{volts:.2}V"),
                kind: AnnotationKind::Voltage,
            });
        }
    }

    for (_, component) in diagram.components() {
        if component.kind() != PartKind::VoltageSource {
            continue;
        }
        let (Some(name), Some(point)) = (component.name(), component.point(0)) else {
            continue;
        };
        if let Some(amps) = results.current(name) {
            annotations.push(Annotation {
                location: point.location(),
                label: format!("I({name})"),
                text: format!("{}A", format_engineering(amps, 3)),
                kind: AnnotationKind::Current,
            });
        }
    }

    annotations
}
