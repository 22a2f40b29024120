use std::collections::BTreeMap;

use glam::{DVec2, IVec2};

use crate::error::{Error, Result};
use crate::geometry::{Location, NEAR_DISTANCE, Rect, Rotation, line_distance};
use crate::labeling::GROUND_LABEL;
use crate::part::PartKind;
use crate::source::SourceFunction;

pub type Properties = BTreeMap<String, String>;

/// A terminal of a component at a fixed local offset.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionPoint {
    offset: IVec2,
    position: IVec2,
    label: Option<String>,
}

impl ConnectionPoint {
    fn new(offset: IVec2) -> Self {
        Self {
            offset,
            position: offset,
            label: None,
        }
    }

    pub fn offset(&self) -> IVec2 {
        self.offset
    }

    pub fn position(&self) -> IVec2 {
        self.position
    }

    pub fn location(&self) -> Location {
        self.position.into()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn coincides_with(&self, other: &ConnectionPoint) -> bool {
        self.position == other.position
    }

    pub(crate) fn set_label(&mut self, label: String) {
        self.label = Some(label);
    }
}

/// A placed part or wire.
///
/// Position and orientation changes go through [`crate::Diagram`] so that
/// the location index stays in step with the connection points.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    kind: PartKind,
    origin: IVec2,
    rotation: Rotation,
    properties: Properties,
    points: Vec<ConnectionPoint>,
    bounds: [i32; 4],
    bbox: Rect,
}

impl Component {
    /// A part with its default properties and no instance name.
    pub fn new(kind: PartKind, origin: IVec2, rotation: Rotation) -> Self {
        if kind.is_wire() {
            return Self::wire(origin, origin);
        }
        let schema = kind.schema();
        let properties = schema
            .defaults
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let points = schema
            .offsets
            .iter()
            .map(|&(x, y)| ConnectionPoint::new(IVec2::new(x, y)))
            .collect();
        let mut component = Self {
            kind,
            origin,
            rotation,
            properties,
            points,
            bounds: schema.bounds,
            bbox: Rect::from_corners(DVec2::ZERO, DVec2::ZERO),
        };
        component.update_coords();
        component
    }

    /// A wire from `start` to `end`. The origin is the first endpoint.
    pub fn wire(start: IVec2, end: IVec2) -> Self {
        let delta = end - start;
        let mut component = Self {
            kind: PartKind::Wire,
            origin: start,
            rotation: Rotation::IDENTITY,
            properties: Properties::new(),
            points: vec![
                ConnectionPoint::new(IVec2::ZERO),
                ConnectionPoint::new(delta),
            ],
            bounds: [
                delta.x.min(0),
                delta.y.min(0),
                delta.x.max(0),
                delta.y.max(0),
            ],
            bbox: Rect::from_corners(DVec2::ZERO, DVec2::ZERO),
        };
        component.update_coords();
        component
    }

    pub fn kind(&self) -> PartKind {
        self.kind
    }

    pub fn origin(&self) -> IVec2 {
        self.origin
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn bbox(&self) -> Rect {
        self.bbox
    }

    pub fn points(&self) -> &[ConnectionPoint] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<&ConnectionPoint> {
        self.points.get(index)
    }

    pub fn locations(&self) -> impl Iterator<Item = Location> + '_ {
        self.points.iter().map(ConnectionPoint::location)
    }

    /// Both endpoints of a wire, in stored order.
    pub fn endpoints(&self) -> Option<(IVec2, IVec2)> {
        match (self.kind, self.points.as_slice()) {
            (PartKind::Wire, [a, b]) => Some((a.position, b.position)),
            _ => None,
        }
    }

    pub fn length(&self) -> f64 {
        match self.endpoints() {
            Some((a, b)) => a.as_dvec2().distance(b.as_dvec2()),
            None => 0.0,
        }
    }

    /// The index of the opposite end of a wire.
    pub fn other_end(&self, index: usize) -> Option<usize> {
        match (self.kind.is_wire(), index) {
            (true, 0) => Some(1),
            (true, 1) => Some(0),
            _ => None,
        }
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.property("name")
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Properties a user may edit. Keys starting with `_` are internal.
    pub fn editable_properties(&self) -> Properties {
        self.properties
            .iter()
            .filter(|(k, _)| !k.starts_with('_'))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Writes back edited values for keys the component already has.
    /// Returns whether anything changed.
    pub fn apply_properties(&mut self, edited: &Properties) -> bool {
        let mut changed = false;
        for (key, value) in edited {
            if let Some(current) = self.properties.get_mut(key)
                && current != value
            {
                *current = value.clone();
                changed = true;
            }
        }
        changed
    }

    /// Fixed label this component injects into the labeling pass.
    pub fn seed_label(&self) -> Option<String> {
        if !self.kind.seeds_label() {
            return None;
        }
        if self.kind.is_ground() {
            return Some(GROUND_LABEL.to_string());
        }
        Some(self.property("label").unwrap_or("???").to_string())
    }

    /// The parsed `value` descriptor of a source, `None` for other kinds.
    pub fn source_function(&self) -> Result<Option<SourceFunction>> {
        if !self.kind.is_source() {
            return Ok(None);
        }
        let value = self.property("value").ok_or_else(|| Error::MissingProperty {
            part: self.kind.to_string(),
            property: "value".to_string(),
        })?;
        value.parse().map(Some)
    }

    /// Recomputes absolute connection positions and the bounding box.
    fn update_coords(&mut self) {
        for point in &mut self.points {
            point.position = self.origin + self.rotation.apply(point.offset);
        }
        let [left, top, right, bottom] = self.bounds;
        let a = self.rotation.apply(IVec2::new(left, top));
        let b = self.rotation.apply(IVec2::new(right, bottom));
        self.bbox = Rect::from_corners(
            (self.origin + a).as_dvec2(),
            (self.origin + b).as_dvec2(),
        );
    }

    pub(crate) fn translate(&mut self, delta: IVec2) {
        self.origin += delta;
        self.update_coords();
    }

    pub(crate) fn rotate(&mut self, amount: u8) {
        self.rotation = self.rotation.rotate(amount);
        self.update_coords();
    }

    pub(crate) fn clear_labels(&mut self) {
        for point in &mut self.points {
            point.label = None;
        }
    }

    pub(crate) fn point_mut(&mut self, index: usize) -> Option<&mut ConnectionPoint> {
        self.points.get_mut(index)
    }

    /// A copy placed at `origin` with no connection labels.
    pub fn clone_at(&self, origin: IVec2) -> Component {
        let mut copy = self.clone();
        copy.origin = origin;
        copy.clear_labels();
        copy.update_coords();
        copy
    }

    pub fn near(&self, p: DVec2) -> bool {
        let zone = self.bbox.expand(NEAR_DISTANCE);
        if !zone.contains(p) {
            return false;
        }
        match self.endpoints() {
            Some((a, b)) => line_distance(p, a.as_dvec2(), b.as_dvec2()) <= NEAR_DISTANCE,
            None => true,
        }
    }

    /// Wires are selected only when an endpoint falls inside the rectangle;
    /// parts whenever their bounding box overlaps it.
    pub fn selected_by_rect(&self, rect: &Rect) -> bool {
        match self.endpoints() {
            Some((a, b)) => rect.contains(a.as_dvec2()) || rect.contains(b.as_dvec2()),
            None => self.bbox.intersects(rect),
        }
    }
}
