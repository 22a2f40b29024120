use std::fmt;
use std::str::FromStr;

use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Hit-test tolerance, in grid units, around wires and part bounding boxes.
pub const NEAR_DISTANCE: f64 = 2.0;

/// Largest coordinate magnitude accepted from saved diagrams. Offsets and
/// wire spans between such points stay within `i32`.
pub const GRID_LIMIT: i32 = 1 << 29;

/// Orientation of a component: four quarter turns, each optionally mirrored.
///
/// Indices 0-3 are plain rotations by 0, 90, 180 and 270 degrees. Indices 4-7
/// are the same rotations applied to a mirrored local frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rotation(u8);

impl Rotation {
    pub const IDENTITY: Rotation = Rotation(0);
    pub const COUNT: u8 = 8;

    pub fn new(index: u8) -> Option<Self> {
        (index < Self::COUNT).then_some(Self(index))
    }

    /// Any integer, reduced modulo 8.
    pub fn wrapping(index: i64) -> Self {
        Self(index.rem_euclid(Self::COUNT as i64) as u8)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn rotate(self, amount: u8) -> Self {
        Self(((self.0 as u16 + amount as u16) % Self::COUNT as u16) as u8)
    }

    pub fn is_mirrored(self) -> bool {
        self.0 >= 4
    }

    /// Maps a local offset into the device frame (before translation).
    pub fn apply(self, p: IVec2) -> IVec2 {
        match self.0 {
            0 => p,
            1 => IVec2::new(-p.y, p.x),
            2 => IVec2::new(-p.x, -p.y),
            3 => IVec2::new(p.y, -p.x),
            4 => IVec2::new(-p.x, p.y),
            5 => IVec2::new(-p.y, -p.x),
            6 => IVec2::new(p.x, -p.y),
            _ => IVec2::new(p.y, p.x),
        }
    }

    /// Remaps a text anchor so that it keeps its visual position under this
    /// orientation.
    pub fn align(self, alignment: Alignment) -> Alignment {
        Alignment::ALL[ALIGNMENT_REMAP[self.0 as usize][alignment as usize] as usize]
    }
}

impl TryFrom<u8> for Rotation {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rotation::new(value).ok_or_else(|| format!("rotation {value} out of range 0..=7"))
    }
}

impl From<Rotation> for u8 {
    fn from(rotation: Rotation) -> Self {
        rotation.0
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Text anchor positions, row-major from top-left to bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alignment {
    TopLeft = 0,
    TopCenter = 1,
    TopRight = 2,
    CenterLeft = 3,
    Center = 4,
    CenterRight = 5,
    BottomLeft = 6,
    BottomCenter = 7,
    BottomRight = 8,
}

impl Alignment {
    pub const ALL: [Alignment; 9] = [
        Alignment::TopLeft,
        Alignment::TopCenter,
        Alignment::TopRight,
        Alignment::CenterLeft,
        Alignment::Center,
        Alignment::CenterRight,
        Alignment::BottomLeft,
        Alignment::BottomCenter,
        Alignment::BottomRight,
    ];
}

const ALIGNMENT_REMAP: [[u8; 9]; 8] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8],
    [2, 5, 8, 1, 4, 7, 0, 3, 6],
    [8, 7, 6, 5, 4, 3, 2, 1, 0],
    [6, 3, 0, 7, 4, 1, 8, 5, 2],
    [2, 1, 0, 5, 4, 3, 8, 7, 6],
    [8, 5, 2, 7, 4, 1, 6, 3, 0],
    [6, 7, 8, 3, 4, 5, 0, 1, 2],
    [0, 3, 6, 1, 4, 7, 2, 5, 8],
];

/// An integer grid point. Two connection points are connected exactly when
/// their locations are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn as_vec(self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    pub fn as_dvec(self) -> DVec2 {
        self.as_vec().as_dvec2()
    }
}

impl From<IVec2> for Location {
    fn from(p: IVec2) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<Location> for IVec2 {
    fn from(location: Location) -> Self {
        location.as_vec()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidLocation(s.to_string());
        let (x, y) = s.split_once(',').ok_or_else(invalid)?;
        let x = x.trim().parse().map_err(|_| invalid())?;
        let y = y.trim().parse().map_err(|_| invalid())?;
        Ok(Self { x, y })
    }
}

/// Axis-aligned rectangle in device coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: DVec2,
    pub max: DVec2,
}

impl Rect {
    /// Builds a rectangle from any two opposite corners.
    pub fn from_corners(a: DVec2, b: DVec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn contains(&self, p: DVec2) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn expand(&self, by: f64) -> Rect {
        Rect {
            min: self.min - DVec2::splat(by),
            max: self.max + DVec2::splat(by),
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

fn cross(a: IVec2, b: IVec2, c: IVec2) -> i64 {
    let a = a.as_i64vec2();
    let ab = b.as_i64vec2() - a;
    let ac = c.as_i64vec2() - a;
    ab.x * ac.y - ab.y * ac.x
}

pub fn collinear(a: IVec2, b: IVec2, c: IVec2) -> bool {
    cross(a, b, c) == 0
}

/// True when `p` lies strictly inside the segment `a`-`b`: on the line,
/// within its extent, and not at either endpoint.
pub fn bisects(p: IVec2, a: IVec2, b: IVec2) -> bool {
    if p == a || p == b || !collinear(a, b, p) {
        return false;
    }
    let min = a.min(b);
    let max = a.max(b);
    p.cmpge(min).all() && p.cmple(max).all()
}

/// Distance from `p` to the infinite line through `a` and `b`, or to `a`
/// when the segment is degenerate.
pub fn line_distance(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    let d = b - a;
    let length = d.length();
    if length == 0.0 {
        return p.distance(a);
    }
    d.perp_dot(p - a).abs() / length
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collinear_at_grid_extremes() {
        let a = IVec2::new(i32::MIN, 0);
        let b = IVec2::new(i32::MAX, 0);
        assert!(collinear(a, b, IVec2::new(0, 0)));
        assert!(!collinear(a, b, IVec2::new(0, 1)));
        assert!(bisects(IVec2::new(0, 0), a, b));
    }

    #[test]
    fn test_rotation_maps() {
        let p = IVec2::new(2, 5);
        let expected = [
            (2, 5),
            (-5, 2),
            (-2, -5),
            (5, -2),
            (-2, 5),
            (-5, -2),
            (2, -5),
            (5, 2),
        ];
        for (index, (x, y)) in expected.into_iter().enumerate() {
            let rotation = Rotation::new(index as u8).unwrap();
            assert_eq!(rotation.apply(p), IVec2::new(x, y), "rotation {index}");
        }
    }

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(Rotation::new(7).unwrap().rotate(1), Rotation::IDENTITY);
        assert_eq!(Rotation::new(3).unwrap().rotate(3).index(), 6);
        assert_eq!(Rotation::wrapping(-1).index(), 7);
        assert!(Rotation::new(8).is_none());
        assert!(Rotation::new(5).unwrap().is_mirrored());
    }

    #[test]
    fn test_four_quarter_turns_are_identity() {
        let p = IVec2::new(-24, 24);
        let quarter = Rotation::new(1).unwrap();
        let mut q = p;
        for _ in 0..4 {
            q = quarter.apply(q);
        }
        assert_eq!(q, p);
    }

    #[test]
    fn test_alignment_remap() {
        let identity = Rotation::IDENTITY;
        for a in Alignment::ALL {
            assert_eq!(identity.align(a), a);
        }
        let half = Rotation::new(2).unwrap();
        assert_eq!(half.align(Alignment::TopLeft), Alignment::BottomRight);
        let west = Rotation::new(3).unwrap();
        assert_eq!(west.align(Alignment::BottomRight), Alignment::TopRight);
        assert_eq!(west.align(Alignment::Center), Alignment::Center);
    }

    #[test]
    fn test_location_text() {
        let location: Location = "-16,48".parse().unwrap();
        assert_eq!(location, Location::new(-16, 48));
        assert_eq!(location.to_string(), "-16,48");
        assert!("16".parse::<Location>().is_err());
        assert!("a,b".parse::<Location>().is_err());
    }

    #[test]
    fn test_rect() {
        let r = Rect::from_corners(DVec2::new(10.0, 10.0), DVec2::new(0.0, 0.0));
        assert_eq!(r.min, DVec2::ZERO);
        assert!(r.contains(DVec2::new(10.0, 5.0)));
        assert!(!r.contains(DVec2::new(10.5, 5.0)));
        assert!(r.expand(1.0).contains(DVec2::new(10.5, 5.0)));

        let other = Rect::from_corners(DVec2::new(10.0, 10.0), DVec2::new(20.0, 20.0));
        assert!(r.intersects(&other));
        let apart = Rect::from_corners(DVec2::new(11.0, 0.0), DVec2::new(20.0, 20.0));
        assert!(!r.intersects(&apart));
    }

    #[test]
    fn test_bisects() {
        let a = IVec2::new(0, 0);
        let b = IVec2::new(0, 48);
        assert!(bisects(IVec2::new(0, 24), a, b));
        assert!(!bisects(a, a, b));
        assert!(!bisects(b, a, b));
        assert!(!bisects(IVec2::new(0, 56), a, b));
        assert!(!bisects(IVec2::new(1, 24), a, b));

        let diagonal = IVec2::new(16, 8);
        assert!(bisects(IVec2::new(8, 4), a, diagonal));
        assert!(!bisects(IVec2::new(8, 5), a, diagonal));
    }

    #[test]
    fn test_line_distance() {
        let d = line_distance(
            DVec2::new(3.0, 10.0),
            DVec2::new(0.0, 0.0),
            DVec2::new(0.0, 48.0),
        );
        assert_eq!(d, 3.0);
        let degenerate = line_distance(DVec2::new(3.0, 4.0), DVec2::ZERO, DVec2::ZERO);
        assert_eq!(degenerate, 5.0);
    }
}
