//! Topology engine for grid-based circuit diagrams.
//!
//! A [`Diagram`] holds placed components (parts and wires) and an index from
//! every occupied grid [`Location`] to the connection points sitting there.
//! Two connection points are electrically connected exactly when they share
//! a location, or when a chain of wires links their locations.
//!
//! Edits keep two properties of the drawing intact:
//!
//! * no connection point lies strictly inside a wire; such wires are split
//!   at that point;
//! * collinear wires meeting end to end with nothing else attached are
//!   merged when [`Diagram::clean_up_wires`] runs.
//!
//! Before export, [`Diagram::label_connection_points`] assigns every node a
//! label (`"0"` for ground) so that [`Diagram::to_netlist_rows`] can emit the
//! simulator netlist. [`Diagram::to_structural_json`] is the lossless save
//! format.

pub mod clipboard;
pub mod component;
pub mod diagram;
mod error;
pub mod geometry;
pub mod labeling;
pub mod netlist;
pub mod part;
pub mod schematic_json;
pub mod source;

pub use clipboard::Clipboard;
pub use component::{Component, ConnectionPoint, Properties};
pub use diagram::{
    ComponentId, ConnectionMark, Diagram, InstanceCounters, PointRef, PropertyEditor, Violation,
};
pub use error::{Error, Result};
pub use geometry::{Alignment, GRID_LIMIT, Location, Rect, Rotation};
pub use labeling::{GROUND_LABEL, LabelConflict, Labeling};
pub use netlist::{NetlistRow, write_netlist};
pub use part::{PartKind, PartSchema};
pub use schematic_json::ViewSettings;
pub use source::{SourceFunction, SourceKind, format_engineering, parse_number};

pub use glam::{DVec2, IVec2};
