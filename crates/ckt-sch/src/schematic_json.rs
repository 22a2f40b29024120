//! Structural JSON: the lossless save format.
//!
//! A diagram is a JSON array with one entry per component, in list order,
//! followed by a `view` entry:
//!
//! ```text
//! ["w", [x1, y1, x2, y2]]                                  a wire
//! ["general", tag, [x, y, rotation], {properties}, [labels]]  any other part
//! ["view", origin_x, origin_y, scale, ac_npts, ac_fstart, ac_fstop,
//!          ac_source_name, tran_npts, tran_tstop, dc_max_iters]
//! ```
//!
//! Labels are written for reference only and recomputed after loading.

use glam::IVec2;
use serde_json::{Value, json};

use crate::component::{Component, Properties};
use crate::diagram::{ComponentId, Diagram};
use crate::error::{Error, Result};
use crate::geometry::{GRID_LIMIT, Rotation};
use crate::part::PartKind;

const VIEW_TAG: &str = "view";
const WIRE_TAG: &str = "w";
const COMPONENT_TAG: &str = "general";

/// Viewport and analysis settings stored alongside the diagram.
///
/// Analysis settings are kept as raw JSON values since editors store them
/// either as numbers or as text such as `"1k"`.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSettings {
    pub origin_x: f64,
    pub origin_y: f64,
    pub scale: f64,
    pub ac_npts: Value,
    pub ac_fstart: Value,
    pub ac_fstop: Value,
    pub ac_source_name: Value,
    pub tran_npts: Value,
    pub tran_tstop: Value,
    pub dc_max_iters: Value,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            scale: 2.0,
            ac_npts: Value::Null,
            ac_fstart: Value::Null,
            ac_fstop: Value::Null,
            ac_source_name: Value::Null,
            tran_npts: Value::Null,
            tran_tstop: Value::Null,
            dc_max_iters: Value::Null,
        }
    }
}

impl ViewSettings {
    fn to_json(&self) -> Value {
        json!([
            VIEW_TAG,
            self.origin_x,
            self.origin_y,
            self.scale,
            self.ac_npts,
            self.ac_fstart,
            self.ac_fstop,
            self.ac_source_name,
            self.tran_npts,
            self.tran_tstop,
            self.dc_max_iters,
        ])
    }

    fn from_json(entry: usize, fields: &[Value]) -> Result<Self> {
        let defaults = ViewSettings::default();
        let field = |i: usize| fields.get(i).cloned().unwrap_or(Value::Null);
        let number = |i: usize, default: f64| -> Result<f64> {
            match fields.get(i) {
                None | Some(Value::Null) => Ok(default),
                Some(Value::Number(n)) => n.as_f64().ok_or_else(|| malformed(entry, "view value out of range")),
                Some(Value::String(s)) => s
                    .trim()
                    .parse()
                    .map_err(|_| malformed(entry, format!("view value '{s}' is not a number"))),
                Some(_) => Err(malformed(entry, "view values must be numbers")),
            }
        };
        Ok(Self {
            origin_x: number(1, defaults.origin_x)?,
            origin_y: number(2, defaults.origin_y)?,
            scale: number(3, defaults.scale)?,
            ac_npts: field(4),
            ac_fstart: field(5),
            ac_fstop: field(6),
            ac_source_name: field(7),
            tran_npts: field(8),
            tran_tstop: field(9),
            dc_max_iters: field(10),
        })
    }
}

fn malformed(entry: usize, reason: impl Into<String>) -> Error {
    Error::MalformedEntry {
        entry,
        reason: reason.into(),
    }
}

fn grid_coordinate(entry: usize, value: &Value) -> Result<i32> {
    let coordinate = if let Some(i) = value.as_i64() {
        i32::try_from(i).ok()
    } else {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i32::MIN as f64 && *f <= i32::MAX as f64)
            .map(|f| f as i32)
    };
    coordinate
        .filter(|c| (-GRID_LIMIT..=GRID_LIMIT).contains(c))
        .ok_or_else(|| malformed(entry, format!("{value} is not a grid coordinate")))
}

fn property_value(entry: usize, key: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Null => Ok(None),
        _ => Err(malformed(entry, format!("property '{key}' must be a string"))),
    }
}

impl Component {
    fn to_structural_json(&self, with_labels: bool) -> Value {
        if let Some((start, end)) = self.endpoints() {
            return json!([WIRE_TAG, [start.x, start.y, end.x, end.y]]);
        }
        let labels: Vec<Value> = self
            .points()
            .iter()
            .map(|p| match p.label() {
                Some(label) if with_labels => Value::String(label.to_string()),
                _ => Value::Null,
            })
            .collect();
        json!([
            COMPONENT_TAG,
            self.kind().tag(),
            [self.origin().x, self.origin().y, self.rotation().index()],
            self.properties(),
            labels,
        ])
    }
}

enum Entry {
    View(ViewSettings),
    Wire(IVec2, IVec2),
    Part {
        kind: PartKind,
        origin: IVec2,
        rotation: Rotation,
        properties: Properties,
    },
}

fn parse_entry(entry: usize, value: &Value) -> Result<Entry> {
    let fields = value
        .as_array()
        .ok_or_else(|| malformed(entry, "expected an array"))?;
    let tag = fields
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(entry, "expected a tag string"))?;
    match tag {
        VIEW_TAG => Ok(Entry::View(ViewSettings::from_json(entry, fields)?)),
        WIRE_TAG => {
            let coords = fields
                .get(1)
                .and_then(Value::as_array)
                .filter(|c| c.len() == 4)
                .ok_or_else(|| malformed(entry, "wire needs [x1, y1, x2, y2]"))?;
            let c: Vec<i32> = coords
                .iter()
                .map(|v| grid_coordinate(entry, v))
                .collect::<Result<_>>()?;
            Ok(Entry::Wire(IVec2::new(c[0], c[1]), IVec2::new(c[2], c[3])))
        }
        _ => {
            let type_tag = fields
                .get(1)
                .and_then(Value::as_str)
                .ok_or_else(|| malformed(entry, "expected a part type"))?;
            let kind: PartKind = type_tag.parse()?;
            if kind.is_wire() {
                return Err(malformed(entry, "wires must use the 'w' entry form"));
            }
            let coords = fields
                .get(2)
                .and_then(Value::as_array)
                .filter(|c| c.len() == 2 || c.len() == 3)
                .ok_or_else(|| malformed(entry, "part needs [x, y, rotation]"))?;
            let x = grid_coordinate(entry, &coords[0])?;
            let y = grid_coordinate(entry, &coords[1])?;
            let rotation = match coords.get(2) {
                Some(r) => u8::try_from(grid_coordinate(entry, r)?)
                    .ok()
                    .and_then(Rotation::new)
                    .ok_or_else(|| malformed(entry, format!("rotation {r} out of range 0..=7")))?,
                None => Rotation::IDENTITY,
            };
            let mut properties = Properties::new();
            match fields.get(3) {
                Some(Value::Object(map)) => {
                    for (key, value) in map {
                        if let Some(text) = property_value(entry, key, value)? {
                            properties.insert(key.clone(), text);
                        }
                    }
                }
                None | Some(Value::Null) => {}
                Some(_) => return Err(malformed(entry, "properties must be an object")),
            }
            Ok(Entry::Part {
                kind,
                origin: IVec2::new(x, y),
                rotation,
                properties,
            })
        }
    }
}

impl Diagram {
    /// Labels are included only while they match the current topology.
    pub fn to_structural_json(&self) -> Value {
        let with_labels = self.labels_current();
        let mut entries: Vec<Value> = self
            .components()
            .map(|(_, c)| c.to_structural_json(with_labels))
            .collect();
        entries.push(self.view.to_json());
        Value::Array(entries)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_structural_json())?)
    }

    pub fn to_json_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_structural_json())?)
    }

    /// Builds a diagram from structural JSON. Nothing is returned unless
    /// every entry parses.
    pub fn from_structural_json(value: &Value) -> Result<Diagram> {
        let entries = value
            .as_array()
            .ok_or_else(|| Error::MalformedDiagram("expected a top-level array".into()))?;
        let parsed: Vec<Entry> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| parse_entry(i, entry))
            .collect::<Result<_>>()?;

        let mut diagram = Diagram::new();
        let mut placed: Vec<ComponentId> = Vec::with_capacity(parsed.len());
        for entry in parsed {
            match entry {
                Entry::View(view) => diagram.view = view,
                Entry::Wire(start, end) => placed.push(diagram.place(Component::wire(start, end))),
                Entry::Part {
                    kind,
                    origin,
                    rotation,
                    properties,
                } => {
                    let mut part = diagram.new_part(kind, origin, rotation);
                    for (key, value) in properties {
                        part.set_property(key, value);
                    }
                    placed.push(diagram.place(part));
                }
            }
        }
        diagram.settle(placed);
        log::debug!(
            "Loaded {} components at {} locations",
            diagram.len(),
            diagram.location_count()
        );
        Ok(diagram)
    }

    /// Parses a saved diagram. Blank input is an empty diagram.
    pub fn from_json_str(text: &str) -> Result<Diagram> {
        if text.trim().is_empty() {
            return Ok(Diagram::new());
        }
        let value: Value = serde_json::from_str(text)?;
        Self::from_structural_json(&value)
    }
}
