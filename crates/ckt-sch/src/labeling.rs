//! Node labeling: every connection point gets the label of its electrical
//! node. Ground nodes are `"0"`, user-labeled nodes keep their names, and
//! all remaining nodes are numbered from 1 in component order.

use log::warn;
use thiserror::Error;

use crate::diagram::{Diagram, PointRef};
use crate::geometry::Location;

pub const GROUND_LABEL: &str = "0";

/// Two different fixed labels reached the same node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("node at {location} has two conflicting labels: {existing}, {incoming}")]
pub struct LabelConflict {
    pub location: Location,
    pub existing: String,
    pub incoming: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labeling {
    /// Number of generated node labels.
    pub minted: u32,
    pub conflicts: Vec<LabelConflict>,
}

impl Labeling {
    pub fn is_consistent(&self) -> bool {
        self.conflicts.is_empty()
    }
}

impl Diagram {
    /// Recomputes every connection label from scratch.
    ///
    /// Conflicts do not abort the pass: the first label to reach a point
    /// wins and each conflict is reported once.
    pub fn label_connection_points(&mut self) -> Labeling {
        let mut report = Labeling::default();
        for component in self.components_mut() {
            component.clear_labels();
        }

        // Grounds go first so that a ground node is always "0".
        let mut seeds: Vec<(bool, PointRef, String)> = self
            .components()
            .filter_map(|(id, c)| Some((!c.kind().is_ground(), PointRef::new(id, 0), c.seed_label()?)))
            .collect();
        seeds.sort_by_key(|(named, _, _)| *named);
        for (_, point, label) in seeds {
            self.propagate_label(point, &label, &mut report);
        }

        let unlabeled: Vec<PointRef> = self
            .components()
            .filter(|(_, c)| !c.kind().is_wire())
            .flat_map(|(id, c)| (0..c.points().len()).map(move |index| PointRef::new(id, index)))
            .collect();
        for point in unlabeled {
            let labeled = self
                .connection_point(point)
                .is_some_and(|p| p.label().is_some());
            if !labeled {
                report.minted += 1;
                let label = report.minted.to_string();
                self.propagate_label(point, &label, &mut report);
            }
        }

        for conflict in &report.conflicts {
            warn!("{conflict}");
        }
        self.mark_labeled();
        report
    }

    /// Floods `label` through every point reachable from `start` via shared
    /// locations and wires.
    fn propagate_label(&mut self, start: PointRef, label: &str, report: &mut Labeling) {
        let mut stack = vec![start];
        while let Some(point) = stack.pop() {
            let Some(cp) = self.connection_point_mut(point) else {
                continue;
            };
            match cp.label() {
                None => {
                    cp.set_label(label.to_string());
                    let location = cp.location();
                    stack.extend(self.connections_at(location).iter().copied());
                    if let Some(other) = self
                        .component(point.component)
                        .and_then(|c| c.other_end(point.index))
                    {
                        stack.push(PointRef::new(point.component, other));
                    }
                }
                Some(existing) if existing != label => {
                    if existing != GROUND_LABEL && label != GROUND_LABEL {
                        let conflict = LabelConflict {
                            location: cp.location(),
                            existing: existing.to_string(),
                            incoming: label.to_string(),
                        };
                        if !report.conflicts.contains(&conflict) {
                            report.conflicts.push(conflict);
                        }
                    }
                }
                Some(_) => {}
            }
        }
    }
}
