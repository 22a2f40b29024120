use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use glam::{DVec2, IVec2};
use log::{debug, warn};
use thiserror::Error;

use crate::component::{Component, ConnectionPoint, Properties};
use crate::error::{Error, Result};
use crate::geometry::{Location, Rect, Rotation, bisects, collinear};
use crate::part::PartKind;
use crate::schematic_json::ViewSettings;
use crate::source::SourceFunction;

/// Stable handle to a component. Ids are never reused within a diagram and
/// increase in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One connection point of one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointRef {
    pub component: ComponentId,
    pub index: usize,
}

impl PointRef {
    pub fn new(component: ComponentId, index: usize) -> Self {
        Self { component, index }
    }
}

impl fmt::Display for PointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.index)
    }
}

/// Per-kind counters used to mint default instance names (`r0`, `r1`, ...).
#[derive(Debug, Clone, Default)]
pub struct InstanceCounters(BTreeMap<PartKind, u32>);

impl InstanceCounters {
    pub fn current(&self, kind: PartKind) -> u32 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn bump(&mut self, kind: PartKind) {
        *self.0.entry(kind).or_insert(0) += 1;
    }

    pub fn mint(&self, kind: PartKind) -> Option<String> {
        let prefix = kind.schema().name_prefix?;
        Some(format!("{prefix}{}", self.current(kind)))
    }
}

/// Supplies edited property values for one component.
pub trait PropertyEditor {
    /// Returns the edited map, or `None` to cancel.
    fn edit(&mut self, component: &Component, properties: Properties) -> Option<Properties>;
}

impl<F> PropertyEditor for F
where
    F: FnMut(&Component, Properties) -> Option<Properties>,
{
    fn edit(&mut self, component: &Component, properties: Properties) -> Option<Properties> {
        self(component, properties)
    }
}

/// How a location is drawn: a dangling terminal or a junction of three or
/// more terminals. Locations joining exactly two terminals get no mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMark {
    Open,
    Junction,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("index lists {point} at {location} but the point is elsewhere")]
    StaleEntry { location: Location, point: PointRef },

    #[error("connection point {point} at {location} is missing from the index")]
    MissingEntry { location: Location, point: PointRef },

    #[error("connection point at {location} lies inside wire {wire}")]
    SilentBisection { location: Location, wire: ComponentId },

    #[error("collinear wires meet at {location} and could be merged")]
    UnmergedWires { location: Location },
}

impl Violation {
    /// Unmerged wires are an untidy drawing rather than a broken topology.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Violation::UnmergedWires { .. })
    }
}

/// A circuit diagram: components in insertion order plus an index from each
/// occupied grid location to the connection points there.
#[derive(Debug, Clone, Default)]
pub struct Diagram {
    components: BTreeMap<ComponentId, Component>,
    index: BTreeMap<Location, Vec<PointRef>>,
    counters: InstanceCounters,
    next_id: u64,
    labels_current: bool,
    pub view: ViewSettings,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id)
    }

    /// Mutable access for property edits. Geometry changes go through
    /// [`Diagram::translate_component`] and [`Diagram::rotate_component`].
    pub fn component_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.labels_current = false;
        self.components.get_mut(&id)
    }

    pub fn components(&self) -> impl DoubleEndedIterator<Item = (ComponentId, &Component)> {
        self.components.iter().map(|(id, c)| (*id, c))
    }

    pub fn ids(&self) -> Vec<ComponentId> {
        self.components.keys().copied().collect()
    }

    pub fn wires(&self) -> impl Iterator<Item = (ComponentId, &Component)> {
        self.components().filter(|(_, c)| c.kind().is_wire())
    }

    pub fn counters(&self) -> &InstanceCounters {
        &self.counters
    }

    /// Whether connection labels reflect the current topology.
    pub fn labels_current(&self) -> bool {
        self.labels_current
    }

    pub(crate) fn mark_labeled(&mut self) {
        self.labels_current = true;
    }

    pub fn connection_point(&self, point: PointRef) -> Option<&ConnectionPoint> {
        self.components.get(&point.component)?.point(point.index)
    }

    pub(crate) fn connection_point_mut(&mut self, point: PointRef) -> Option<&mut ConnectionPoint> {
        self.components.get_mut(&point.component)?.point_mut(point.index)
    }

    pub(crate) fn components_mut(&mut self) -> impl Iterator<Item = &mut Component> {
        self.components.values_mut()
    }

    /// All connection points at `location`, in registration order.
    pub fn connections_at(&self, location: Location) -> &[PointRef] {
        self.index.get(&location).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn locations(&self) -> impl Iterator<Item = (Location, &[PointRef])> {
        self.index.iter().map(|(l, points)| (*l, points.as_slice()))
    }

    pub fn location_count(&self) -> usize {
        self.index.len()
    }

    /// A new part with its default properties and a freshly minted name.
    pub fn new_part(&self, kind: PartKind, origin: IVec2, rotation: Rotation) -> Component {
        let mut component = Component::new(kind, origin, rotation);
        if let Some(name) = self.counters.mint(kind) {
            component.set_property("name", name);
        }
        component
    }

    pub fn new_part_by_tag(&self, tag: &str, x: i32, y: i32, rotation: Rotation) -> Result<Component> {
        let kind: PartKind = tag.parse()?;
        Ok(self.new_part(kind, IVec2::new(x, y), rotation))
    }

    /// A copy of `source` at `origin`. Parts with minted names get a fresh one.
    pub fn duplicate(&self, source: &Component, origin: IVec2) -> Component {
        let mut copy = source.clone_at(origin);
        if let Some(name) = self.counters.mint(source.kind()) {
            copy.set_property("name", name);
        }
        copy
    }

    /// Appends a component to the list without indexing its connection points.
    pub fn add_component(&mut self, component: Component) -> ComponentId {
        let id = ComponentId(self.next_id);
        self.next_id += 1;
        self.counters.bump(component.kind());
        self.components.insert(id, component);
        self.labels_current = false;
        id
    }

    /// Removes a component from the list without touching the index.
    pub fn remove_component(&mut self, id: ComponentId) -> Option<Component> {
        let removed = self.components.remove(&id);
        if removed.is_some() {
            self.labels_current = false;
        }
        removed
    }

    /// Indexes a connection point at its current location and returns every
    /// point registered there.
    pub fn register_connection_point(&mut self, point: PointRef) -> Result<&[PointRef]> {
        let location = self
            .connection_point(point)
            .map(ConnectionPoint::location)
            .ok_or(Error::NoSuchComponent(point.component))?;
        self.labels_current = false;
        let entry = self.index.entry(location).or_default();
        if !entry.contains(&point) {
            entry.push(point);
        }
        Ok(entry.as_slice())
    }

    /// Drops a connection point from the entry at `location`, removing the
    /// entry once it is empty.
    pub fn unregister_connection_point(&mut self, point: PointRef, location: Location) {
        if let Some(entry) = self.index.get_mut(&location) {
            entry.retain(|p| *p != point);
            if entry.is_empty() {
                self.index.remove(&location);
            }
            self.labels_current = false;
        }
    }

    /// Moves a point's index entry from `old` to wherever the point now is.
    pub fn relocate_connection_point(&mut self, point: PointRef, old: Location) -> Result<&[PointRef]> {
        self.unregister_connection_point(point, old);
        self.register_connection_point(point)
    }

    /// Adds a component and indexes all of its connection points.
    pub fn place(&mut self, component: Component) -> ComponentId {
        let locations: Vec<Location> = component.locations().collect();
        let id = self.add_component(component);
        for (index, location) in locations.into_iter().enumerate() {
            self.index
                .entry(location)
                .or_default()
                .push(PointRef::new(id, index));
        }
        id
    }

    /// Unindexes all of a component's points and removes it. Wires left
    /// behind are not merged.
    pub fn delete(&mut self, id: ComponentId) -> Option<Component> {
        let component = self.remove_component(id)?;
        for (index, location) in component.locations().enumerate() {
            self.unregister_connection_point(PointRef::new(id, index), location);
        }
        Some(component)
    }

    pub fn translate_component(&mut self, id: ComponentId, delta: IVec2) -> Result<()> {
        self.reposition(id, |c| c.translate(delta))
    }

    pub fn rotate_component(&mut self, id: ComponentId, amount: u8) -> Result<()> {
        self.reposition(id, |c| c.rotate(amount))
    }

    fn reposition(&mut self, id: ComponentId, change: impl FnOnce(&mut Component)) -> Result<()> {
        let component = self
            .components
            .get_mut(&id)
            .ok_or(Error::NoSuchComponent(id))?;
        let old: Vec<Location> = component.locations().collect();
        change(component);
        for (index, location) in old.into_iter().enumerate() {
            self.relocate_connection_point(PointRef::new(id, index), location)?;
        }
        Ok(())
    }

    /// Places a part as a user gesture, splitting any wire it lands on.
    pub fn add_part(&mut self, component: Component) -> ComponentId {
        let id = self.place(component);
        self.settle(vec![id]);
        id
    }

    /// Places a wire and settles any bisections it takes part in. The
    /// returned wire may already have been replaced by its split pieces.
    pub fn add_wire(&mut self, start: IVec2, end: IVec2) -> ComponentId {
        let id = self.place(Component::wire(start, end));
        self.settle(vec![id]);
        id
    }

    /// Replaces `wire` with two wires meeting at `at`, then settles them.
    pub fn split_wire(&mut self, wire: ComponentId, at: IVec2) -> Result<[ComponentId; 2]> {
        let pieces = self.split_wire_unsettled(wire, at)?;
        self.settle(pieces.to_vec());
        Ok(pieces)
    }

    fn split_wire_unsettled(&mut self, wire: ComponentId, at: IVec2) -> Result<[ComponentId; 2]> {
        let (start, end) = self
            .components
            .get(&wire)
            .and_then(Component::endpoints)
            .ok_or(Error::NoSuchComponent(wire))?;
        self.delete(wire);
        debug!("Splitting wire {wire} at {}", Location::from(at));
        let first = self.place(Component::wire(start, at));
        let second = self.place(Component::wire(end, at));
        Ok([first, second])
    }

    /// Splits every wire that one of `id`'s connection points lies inside.
    /// Returns the number of splits made directly for `id`.
    pub fn check_wires(&mut self, id: ComponentId) -> usize {
        let created = self.split_wires_bisected_by(id);
        let splits = created.len() / 2;
        self.settle(created);
        splits
    }

    /// Splits `wire` at the first indexed location lying strictly inside it.
    pub fn check_points_bisecting(&mut self, wire: ComponentId) -> bool {
        let created = self.split_at_first_bisecting_point(wire);
        let split = !created.is_empty();
        self.settle(created);
        split
    }

    fn split_wires_bisected_by(&mut self, id: ComponentId) -> Vec<ComponentId> {
        let candidates: Vec<ComponentId> = self
            .wires()
            .map(|(wire, _)| wire)
            .filter(|wire| *wire != id)
            .collect();
        let mut created = Vec::new();
        for wire in candidates {
            let Some(component) = self.components.get(&id) else {
                break;
            };
            let Some((start, end)) = self.components.get(&wire).and_then(Component::endpoints) else {
                continue;
            };
            let hit = component
                .points()
                .iter()
                .map(ConnectionPoint::position)
                .find(|p| bisects(*p, start, end));
            if let Some(at) = hit
                && let Ok(pieces) = self.split_wire_unsettled(wire, at)
            {
                created.extend(pieces);
            }
        }
        created
    }

    fn split_at_first_bisecting_point(&mut self, wire: ComponentId) -> Vec<ComponentId> {
        let Some((start, end)) = self.components.get(&wire).and_then(Component::endpoints) else {
            return Vec::new();
        };
        let hit = self
            .index
            .keys()
            .map(|location| location.as_vec())
            .find(|p| bisects(*p, start, end));
        match hit {
            Some(at) => self
                .split_wire_unsettled(wire, at)
                .map(Vec::from)
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Runs bisection checks over a worklist until no pending component
    /// produces further splits.
    pub(crate) fn settle(&mut self, pending: Vec<ComponentId>) {
        let mut queue: VecDeque<ComponentId> = pending.into();
        let budget = 4 * (self.index.len() + self.components.len() + queue.len() + 1).pow(2);
        let mut steps = 0;
        while let Some(id) = queue.pop_front() {
            if steps == budget {
                warn!(
                    "Wire settling stopped after {budget} steps with {} components pending",
                    queue.len() + 1
                );
                return;
            }
            steps += 1;
            let Some(component) = self.components.get(&id) else {
                continue;
            };
            let is_wire = component.kind().is_wire();
            queue.extend(self.split_wires_bisected_by(id));
            if is_wire {
                queue.extend(self.split_at_first_bisecting_point(id));
            }
        }
    }

    /// Merges pairs of collinear wires that meet end to end at a location
    /// with no other connections. Returns the number of merges.
    pub fn clean_up_wires(&mut self) -> usize {
        let mut merged = 0;
        for _ in 0..=self.components.len() {
            let pass = self.merge_pass();
            merged += pass;
            if pass == 0 {
                break;
            }
        }
        merged
    }

    fn merge_pass(&mut self) -> usize {
        let mut merged = 0;
        let locations: Vec<Location> = self.index.keys().copied().collect();
        for location in locations {
            let Some((first, second, start, end)) = self.mergeable_at(location) else {
                continue;
            };
            debug!("Merging wires {first} and {second} at {location}");
            self.delete(first);
            self.delete(second);
            if start != end {
                self.add_wire(start, end);
            }
            merged += 1;
        }
        merged
    }

    fn mergeable_at(&self, location: Location) -> Option<(ComponentId, ComponentId, IVec2, IVec2)> {
        let [a, b] = self.index.get(&location)?.as_slice() else {
            return None;
        };
        if a.component == b.component {
            return None;
        }
        let far_end = |point: &PointRef| -> Option<IVec2> {
            let wire = self.components.get(&point.component)?;
            let other = wire.other_end(point.index)?;
            Some(wire.point(other)?.position())
        };
        let start = far_end(a)?;
        let end = far_end(b)?;
        collinear(start, end, location.as_vec()).then_some((a.component, b.component, start, end))
    }

    /// Draws a wire as a user gesture: settle, then tidy up.
    pub fn draw_wire(&mut self, start: IVec2, end: IVec2) -> ComponentId {
        let id = self.add_wire(start, end);
        self.clean_up_wires();
        id
    }

    /// Moves a selection as one drag gesture.
    pub fn move_components(&mut self, ids: &[ComponentId], delta: IVec2) -> Result<()> {
        for id in ids {
            self.translate_component(*id, delta)?;
        }
        if delta != IVec2::ZERO {
            self.settle(ids.to_vec());
        }
        self.clean_up_wires();
        Ok(())
    }

    /// Rotates each selected component a quarter turn about its origin.
    pub fn rotate_components(&mut self, ids: &[ComponentId]) -> Result<()> {
        for id in ids {
            self.rotate_component(*id, 1)?;
        }
        self.settle(ids.to_vec());
        self.clean_up_wires();
        Ok(())
    }

    /// Deletes a selection, then merges any wires it left collinear.
    pub fn delete_components(&mut self, ids: &[ComponentId]) -> Vec<Component> {
        let removed = ids.iter().filter_map(|id| self.delete(*id)).collect();
        self.clean_up_wires();
        removed
    }

    /// Offers a component's editable properties to `editor` and writes back
    /// the values it returns. Returns whether anything changed.
    pub fn edit_properties(&mut self, id: ComponentId, editor: &mut impl PropertyEditor) -> Result<bool> {
        let component = self.components.get(&id).ok_or(Error::NoSuchComponent(id))?;
        let Some(edited) = editor.edit(component, component.editable_properties()) else {
            return Ok(false);
        };
        if component.kind().is_source()
            && let Some(value) = edited.get("value")
        {
            value.parse::<SourceFunction>()?;
        }
        let component = self
            .components
            .get_mut(&id)
            .ok_or(Error::NoSuchComponent(id))?;
        let changed = component.apply_properties(&edited);
        if changed {
            self.labels_current = false;
        }
        Ok(changed)
    }

    /// Replaces a source's `value` with the canonical text of `function`.
    pub fn set_source_function(&mut self, id: ComponentId, function: &SourceFunction) -> Result<bool> {
        let component = self
            .components
            .get_mut(&id)
            .ok_or(Error::NoSuchComponent(id))?;
        if !component.kind().is_source() {
            return Err(Error::InvalidSource {
                descriptor: function.to_string(),
                reason: format!("{} is not a source", component.kind()),
            });
        }
        let value = function.to_string();
        if component.property("value") == Some(value.as_str()) {
            return Ok(false);
        }
        component.set_property("value", value);
        self.labels_current = false;
        Ok(true)
    }

    /// Topmost component near `p`; later components are drawn on top.
    pub fn component_at(&self, p: DVec2) -> Option<ComponentId> {
        self.components()
            .rev()
            .find(|(_, c)| c.near(p))
            .map(|(id, _)| id)
    }

    pub fn components_in_rect(&self, rect: &Rect) -> Vec<ComponentId> {
        self.components()
            .filter(|(_, c)| c.selected_by_rect(rect))
            .map(|(id, _)| id)
            .collect()
    }

    /// Bounding box of the listed components, if any exist.
    pub fn bounding_box(&self, ids: &[ComponentId]) -> Option<Rect> {
        ids.iter()
            .filter_map(|id| self.components.get(id))
            .map(Component::bbox)
            .reduce(|a, b| a.union(&b))
    }

    /// Every occupied location with the number of coincident points.
    pub fn junctions(&self) -> impl Iterator<Item = (Location, usize)> + '_ {
        self.index.iter().map(|(location, points)| (*location, points.len()))
    }

    pub fn connection_marks(&self) -> impl Iterator<Item = (Location, ConnectionMark)> + '_ {
        self.index.iter().filter_map(|(location, points)| match points.len() {
            1 => Some((*location, ConnectionMark::Open)),
            n if n > 2 => Some((*location, ConnectionMark::Junction)),
            _ => None,
        })
    }

    /// Audits the index against component positions and looks for points
    /// lying inside wires or collinear wire pairs left unmerged.
    pub fn check_invariants(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        for (location, points) in &self.index {
            for point in points {
                let actual = self.connection_point(*point).map(ConnectionPoint::location);
                if actual != Some(*location) {
                    violations.push(Violation::StaleEntry {
                        location: *location,
                        point: *point,
                    });
                }
            }
        }
        for (id, component) in &self.components {
            for (index, location) in component.locations().enumerate() {
                let point = PointRef::new(*id, index);
                if !self.connections_at(location).contains(&point) {
                    violations.push(Violation::MissingEntry { location, point });
                }
            }
        }
        for (wire, component) in self.wires() {
            let Some((start, end)) = component.endpoints() else {
                continue;
            };
            for location in self.index.keys() {
                if bisects(location.as_vec(), start, end) {
                    violations.push(Violation::SilentBisection {
                        location: *location,
                        wire,
                    });
                }
            }
        }
        for location in self.index.keys() {
            if self.mergeable_at(*location).is_some() {
                violations.push(Violation::UnmergedWires {
                    location: *location,
                });
            }
        }
        violations
    }
}
