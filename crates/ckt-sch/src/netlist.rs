use std::fmt;
use std::io::{self, Write};

use itertools::Itertools;
use serde::Serialize;

use crate::component::Component;
use crate::diagram::Diagram;
use crate::error::{Error, Result};
use crate::labeling::Labeling;
use crate::source::SourceFunction;

/// One simulator input line: keyword, instance name, node labels, value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NetlistRow(Vec<String>);

impl NetlistRow {
    pub fn keyword(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for NetlistRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(" "))
    }
}

impl Component {
    /// The netlist row for this component, or `None` for kinds that emit
    /// nothing. Connection points must already be labeled.
    pub fn netlist_row(&self) -> Result<Option<NetlistRow>> {
        let schema = self.kind().schema();
        let Some(keyword) = schema.keyword else {
            return Ok(None);
        };
        let missing = |property: &str| Error::MissingProperty {
            part: self.kind().to_string(),
            property: property.to_string(),
        };

        let mut tokens = vec![keyword.to_string()];
        if schema.named {
            tokens.push(self.name().ok_or_else(|| missing("name"))?.to_string());
        }
        for point in self.points() {
            tokens.push(point.label().ok_or(Error::Unlabeled)?.to_string());
        }
        if let Some(key) = schema.value_key {
            let value = self.property(key).ok_or_else(|| missing(key))?;
            if self.kind().is_source() {
                value.parse::<SourceFunction>()?;
            }
            tokens.push(value.to_string());
        }
        Ok(Some(NetlistRow(tokens)))
    }
}

impl Diagram {
    /// Rows for every component in list order. Fails with
    /// [`Error::Unlabeled`] unless the labels match the current topology.
    pub fn to_netlist_rows(&self) -> Result<Vec<NetlistRow>> {
        if !self.labels_current() {
            return Err(Error::Unlabeled);
        }
        let mut rows = Vec::new();
        for (_, component) in self.components() {
            if let Some(row) = component.netlist_row()? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Labels the diagram and returns its rows with the labeling report.
    pub fn netlist(&mut self) -> Result<(Vec<NetlistRow>, Labeling)> {
        let labeling = self.label_connection_points();
        let rows = self.to_netlist_rows()?;
        Ok((rows, labeling))
    }
}

/// Writes one row per line.
pub fn write_netlist(rows: &[NetlistRow], out: &mut impl Write) -> io::Result<()> {
    for row in rows {
        writeln!(out, "{row}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use glam::IVec2;

    use super::*;
    use crate::geometry::Rotation;
    use crate::part::PartKind;

    fn at(x: i32, y: i32) -> IVec2 {
        IVec2::new(x, y)
    }

    #[test]
    fn test_rows_need_labels() {
        let mut d = Diagram::new();
        d.place(d.new_part(PartKind::Resistor, at(0, 0), Rotation::IDENTITY));
        assert!(matches!(d.to_netlist_rows(), Err(Error::Unlabeled)));
        d.label_connection_points();
        assert_eq!(d.to_netlist_rows().unwrap().len(), 1);

        d.place(d.new_part(PartKind::Ground, at(0, 0), Rotation::IDENTITY));
        assert!(matches!(d.to_netlist_rows(), Err(Error::Unlabeled)));
    }

    #[test]
    fn test_row_shapes() {
        let mut d = Diagram::new();
        d.place(d.new_part(PartKind::Ground, at(0, 48), Rotation::IDENTITY));
        d.place(d.new_part(PartKind::VoltageSource, at(0, 0), Rotation::IDENTITY));
        d.place(d.new_part(PartKind::ProbeOut, at(0, 0), Rotation::IDENTITY));
        d.place(d.new_part(PartKind::NFet, at(48, 0), Rotation::IDENTITY));
        let mut label = d.new_part(PartKind::Label, at(96, 96), Rotation::IDENTITY);
        label.set_property("label", "out");
        d.place(label);
        d.add_wire(at(0, 0), at(48, 0));

        let (rows, labeling) = d.netlist().unwrap();
        assert!(labeling.is_consistent());
        let text: Vec<String> = rows.iter().map(ToString::to_string).collect();
        insta::assert_snapshot!(text.join("\n"), @r"
        GROUND 0
        VOLTAGE_SOURCE Vs0 1 0 dc(1)
        VOLTAGE_OUT Vout 1 0
        NFET nMOS0 1 2 3 2
        ");
    }

    #[test]
    fn test_opamp_row() {
        let mut d = Diagram::new();
        d.place(d.new_part(PartKind::OpAmp, at(0, 0), Rotation::IDENTITY));
        let (rows, _) = d.netlist().unwrap();
        assert_eq!(rows[0].to_string(), "OPAMP o0 1 2 3 4 30000");
        assert_eq!(rows[0].keyword(), "OPAMP");
    }

    #[test]
    fn test_missing_name_is_reported() {
        let mut d = Diagram::new();
        d.place(Component::new(PartKind::Resistor, at(0, 0), Rotation::IDENTITY));
        let err = d.netlist().unwrap_err();
        assert_eq!(err.to_string(), "Resistor is missing property 'name'");
    }

    #[test]
    fn test_source_value_must_parse() {
        let mut d = Diagram::new();
        let mut source = d.new_part(PartKind::VoltageSource, at(0, 0), Rotation::IDENTITY);
        source.set_property("value", "banana");
        let id = d.place(source);
        assert!(matches!(d.netlist(), Err(Error::InvalidSource { .. })));

        d.component_mut(id)
            .unwrap()
            .set_property("value", "sin(0,1,1k)");
        let (rows, _) = d.netlist().unwrap();
        assert_eq!(rows[0].keyword(), "VOLTAGE_SOURCE");
        assert!(rows[0].to_string().ends_with(" sin(0,1,1k)"));
    }

    #[test]
    fn test_write_netlist() {
        let mut d = Diagram::new();
        d.place(d.new_part(PartKind::Ground, at(0, 0), Rotation::IDENTITY));
        d.place(d.new_part(PartKind::Resistor, at(0, 0), Rotation::IDENTITY));
        let (rows, _) = d.netlist().unwrap();
        let mut out = Vec::new();
        write_netlist(&rows, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "GROUND 0\nRESISTOR r0 0 1 1\n");
    }
}
