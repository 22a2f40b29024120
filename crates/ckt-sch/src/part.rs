//! The closed set of placeable part kinds and their static geometry.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Static description of a part kind.
#[derive(Debug)]
pub struct PartSchema {
    /// Type tag used in the structural JSON format.
    pub tag: &'static str,
    pub description: &'static str,
    /// Local connection offsets, in canonical netlist order.
    pub offsets: &'static [(i32, i32)],
    /// Local bounding box as `[left, top, right, bottom]`.
    pub bounds: [i32; 4],
    pub keyword: Option<&'static str>,
    /// Whether the netlist row carries the `name` property after the keyword.
    pub named: bool,
    /// Prefix for minted instance names; parts without one keep their default name.
    pub name_prefix: Option<&'static str>,
    /// Property appended as the last token of the netlist row.
    pub value_key: Option<&'static str>,
    pub defaults: &'static [(&'static str, &'static str)],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartKind {
    Wire,
    Ground,
    Label,
    VoltageSource,
    CurrentSource,
    Resistor,
    Capacitor,
    Inductor,
    Diode,
    NFet,
    PFet,
    OpAmp,
    ProbeIn,
    ProbeOut,
}

const TWO_TERMINAL: &[(i32, i32)] = &[(0, 0), (0, 48)];
const MOSFET: &[(i32, i32)] = &[(0, 0), (-24, 24), (0, 48)];

const WIRE: PartSchema = PartSchema {
    tag: "w",
    description: "Wire",
    offsets: &[(0, 0)],
    bounds: [0, 0, 0, 0],
    keyword: None,
    named: false,
    name_prefix: None,
    value_key: None,
    defaults: &[],
};

const GROUND: PartSchema = PartSchema {
    tag: "g",
    description: "Ground connection",
    offsets: &[(0, 0)],
    bounds: [-6, 0, 6, 8],
    keyword: Some("GROUND"),
    named: false,
    name_prefix: None,
    value_key: None,
    defaults: &[],
};

const LABEL: PartSchema = PartSchema {
    tag: "L",
    description: "Node label",
    offsets: &[(0, 0)],
    bounds: [-2, 0, 2, 8],
    keyword: None,
    named: false,
    name_prefix: None,
    value_key: None,
    defaults: &[("label", "???")],
};

const VOLTAGE_SOURCE: PartSchema = PartSchema {
    tag: "v",
    description: "Voltage source",
    offsets: TWO_TERMINAL,
    bounds: [-12, 0, 12, 48],
    keyword: Some("VOLTAGE_SOURCE"),
    named: true,
    name_prefix: Some("Vs"),
    value_key: Some("value"),
    defaults: &[("value", "dc(1)")],
};

const CURRENT_SOURCE: PartSchema = PartSchema {
    tag: "i",
    description: "Current source",
    offsets: TWO_TERMINAL,
    bounds: [-12, 0, 12, 48],
    keyword: Some("CURRENT_SOURCE"),
    named: true,
    name_prefix: Some("Is"),
    value_key: Some("value"),
    defaults: &[("value", "dc(1)")],
};

const RESISTOR: PartSchema = PartSchema {
    tag: "r",
    description: "Resistor",
    offsets: TWO_TERMINAL,
    bounds: [-5, 0, 5, 48],
    keyword: Some("RESISTOR"),
    named: true,
    name_prefix: Some("r"),
    value_key: Some("r"),
    defaults: &[("r", "1")],
};

const CAPACITOR: PartSchema = PartSchema {
    tag: "c",
    description: "Capacitor",
    offsets: TWO_TERMINAL,
    bounds: [-8, 0, 8, 48],
    keyword: Some("CAPACITOR"),
    named: true,
    name_prefix: Some("c"),
    value_key: Some("c"),
    defaults: &[("c", "1p")],
};

const INDUCTOR: PartSchema = PartSchema {
    tag: "l",
    description: "Inductor",
    offsets: TWO_TERMINAL,
    bounds: [-4, 0, 5, 48],
    keyword: Some("INDUCTOR"),
    named: true,
    name_prefix: Some("l"),
    value_key: Some("l"),
    defaults: &[("l", "1n")],
};

const DIODE: PartSchema = PartSchema {
    tag: "d",
    description: "Diode",
    offsets: TWO_TERMINAL,
    bounds: [-8, 0, 8, 48],
    keyword: Some("DIODE"),
    named: true,
    name_prefix: Some("d"),
    value_key: Some("area"),
    defaults: &[("area", "1")],
};

const NFET: PartSchema = PartSchema {
    tag: "n",
    description: "NFet",
    offsets: MOSFET,
    bounds: [-24, 0, 8, 48],
    keyword: Some("NFET"),
    named: true,
    name_prefix: Some("nMOS"),
    value_key: Some("W/L"),
    defaults: &[("W/L", "2")],
};

const PFET: PartSchema = PartSchema {
    tag: "p",
    description: "PFet",
    offsets: MOSFET,
    bounds: [-24, 0, 8, 48],
    keyword: Some("PFET"),
    named: true,
    name_prefix: Some("pMOS"),
    value_key: Some("W/L"),
    defaults: &[("W/L", "2")],
};

const OP_AMP: PartSchema = PartSchema {
    tag: "o",
    description: "Op Amp",
    offsets: &[(0, 0), (0, 16), (48, 8), (24, 32)],
    bounds: [0, -8, 48, 32],
    keyword: Some("OPAMP"),
    named: true,
    name_prefix: Some("o"),
    value_key: Some("A"),
    defaults: &[("A", "30000")],
};

const PROBE_IN: PartSchema = PartSchema {
    tag: "Vin",
    description: "Audio input",
    offsets: TWO_TERMINAL,
    bounds: [-4, 0, 5, 48],
    keyword: Some("VOLTAGE_IN"),
    named: true,
    name_prefix: None,
    value_key: None,
    defaults: &[("name", "Vin")],
};

const PROBE_OUT: PartSchema = PartSchema {
    tag: "Vout",
    description: "Audio output",
    offsets: TWO_TERMINAL,
    bounds: [-4, 0, 5, 48],
    keyword: Some("VOLTAGE_OUT"),
    named: true,
    name_prefix: None,
    value_key: None,
    defaults: &[("name", "Vout")],
};

impl PartKind {
    pub const ALL: [PartKind; 14] = [
        PartKind::Wire,
        PartKind::Ground,
        PartKind::Label,
        PartKind::VoltageSource,
        PartKind::CurrentSource,
        PartKind::Resistor,
        PartKind::Capacitor,
        PartKind::Inductor,
        PartKind::Diode,
        PartKind::NFet,
        PartKind::PFet,
        PartKind::OpAmp,
        PartKind::ProbeIn,
        PartKind::ProbeOut,
    ];

    pub fn schema(self) -> &'static PartSchema {
        match self {
            PartKind::Wire => &WIRE,
            PartKind::Ground => &GROUND,
            PartKind::Label => &LABEL,
            PartKind::VoltageSource => &VOLTAGE_SOURCE,
            PartKind::CurrentSource => &CURRENT_SOURCE,
            PartKind::Resistor => &RESISTOR,
            PartKind::Capacitor => &CAPACITOR,
            PartKind::Inductor => &INDUCTOR,
            PartKind::Diode => &DIODE,
            PartKind::NFet => &NFET,
            PartKind::PFet => &PFET,
            PartKind::OpAmp => &OP_AMP,
            PartKind::ProbeIn => &PROBE_IN,
            PartKind::ProbeOut => &PROBE_OUT,
        }
    }

    /// Kinds offered to the user for placement. Wires are drawn, not placed.
    pub fn palette() -> impl Iterator<Item = PartKind> {
        Self::ALL.into_iter().filter(|kind| !kind.is_wire())
    }

    /// Looks up a kind by its JSON type tag.
    pub fn from_tag(tag: &str) -> Result<Self, Error> {
        PartKind::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| Error::UnknownPart(tag.to_string()))
    }

    pub fn tag(self) -> &'static str {
        self.schema().tag
    }

    pub fn description(self) -> &'static str {
        self.schema().description
    }

    pub fn is_wire(self) -> bool {
        self == PartKind::Wire
    }

    pub fn is_ground(self) -> bool {
        self == PartKind::Ground
    }

    pub fn is_source(self) -> bool {
        matches!(self, PartKind::VoltageSource | PartKind::CurrentSource)
    }

    pub fn has_netlist_row(self) -> bool {
        self.schema().keyword.is_some()
    }

    pub fn has_connections(self) -> bool {
        !self.schema().offsets.is_empty()
    }

    /// Ground and node labels inject a fixed label before numbering starts.
    pub fn seeds_label(self) -> bool {
        matches!(self, PartKind::Ground | PartKind::Label)
    }
}

impl FromStr for PartKind {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        PartKind::from_tag(tag)
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for kind in PartKind::ALL {
            assert_eq!(kind.tag().parse::<PartKind>().unwrap(), kind);
        }
        assert!(matches!(
            "x".parse::<PartKind>(),
            Err(Error::UnknownPart(tag)) if tag == "x"
        ));
    }

    #[test]
    fn test_tags_are_case_sensitive() {
        assert_eq!("l".parse::<PartKind>().unwrap(), PartKind::Inductor);
        assert_eq!("L".parse::<PartKind>().unwrap(), PartKind::Label);
    }

    #[test]
    fn test_palette_excludes_wire() {
        let palette: Vec<_> = PartKind::palette().collect();
        assert_eq!(palette.len(), PartKind::ALL.len() - 1);
        assert!(!palette.contains(&PartKind::Wire));
    }

    #[test]
    fn test_mosfet_keywords() {
        assert_eq!(PartKind::NFet.schema().keyword, Some("NFET"));
        assert_eq!(PartKind::PFet.schema().keyword, Some("PFET"));
    }

    #[test]
    fn test_capabilities() {
        assert!(!PartKind::Wire.has_netlist_row());
        assert!(!PartKind::Label.has_netlist_row());
        assert!(PartKind::OpAmp.has_netlist_row());
        assert!(PartKind::Ground.seeds_label());
        assert!(!PartKind::Resistor.seeds_label());
        assert!(PartKind::ALL.iter().all(|kind| kind.has_connections()));
    }
}
