//! Block-grid geometry: positions, extents, boxes, directions, rotations.
//!
//! Axis conventions follow the host world: `+x` is east, `+y` is up and
//! `+z` is south. Rotations are clockwise when viewed from above and only
//! ever act on the horizontal plane.

use std::fmt;
use std::ops::{Add, Neg, Sub};

// ── BlockPos ──────────────────────────────────────────────────────

/// An integer block coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPos {
    /// East (+) / west (-) axis.
    pub x: i32,
    /// Up (+) / down (-) axis.
    pub y: i32,
    /// South (+) / north (-) axis.
    pub z: i32,
}

impl BlockPos {
    /// The origin `(0, 0, 0)`.
    pub const ZERO: BlockPos = BlockPos { x: 0, y: 0, z: 0 };

    /// Construct a position from its components.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The neighbouring position `distance` blocks towards `direction`.
    pub fn offset(self, direction: Direction, distance: i32) -> Self {
        let step = direction.unit();
        Self {
            x: self.x + step.x * distance,
            y: self.y + step.y * distance,
            z: self.z + step.z * distance,
        }
    }

    /// The position directly above.
    pub fn above(self) -> Self {
        self.offset(Direction::Up, 1)
    }

    /// The position directly below.
    pub fn below(self) -> Self {
        self.offset(Direction::Down, 1)
    }
}

impl Add for BlockPos {
    type Output = BlockPos;

    fn add(self, rhs: BlockPos) -> BlockPos {
        BlockPos::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for BlockPos {
    type Output = BlockPos;

    fn sub(self, rhs: BlockPos) -> BlockPos {
        BlockPos::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for BlockPos {
    type Output = BlockPos;

    fn neg(self) -> BlockPos {
        BlockPos::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<(i32, i32, i32)> for BlockPos {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self::new(x, y, z)
    }
}

// ── Extent ────────────────────────────────────────────────────────

/// Size of a structure footprint in blocks along each axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Extent {
    /// Blocks along x.
    pub x: u32,
    /// Blocks along y.
    pub y: u32,
    /// Blocks along z.
    pub z: u32,
}

impl Extent {
    /// Construct an extent. Zero-sized axes are allowed and denote an
    /// empty footprint.
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// `true` if any axis has zero length.
    pub fn is_empty(&self) -> bool {
        self.x == 0 || self.y == 0 || self.z == 0
    }

    /// Number of blocks covered.
    pub fn volume(&self) -> u64 {
        u64::from(self.x) * u64::from(self.y) * u64::from(self.z)
    }

    /// The footprint after `rotation`: quarter turns swap x and z.
    pub fn rotated(self, rotation: Rotation) -> Self {
        match rotation {
            Rotation::None | Rotation::Clockwise180 => self,
            Rotation::Clockwise90 | Rotation::CounterClockwise90 => Self::new(self.z, self.y, self.x),
        }
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.z)
    }
}

// ── BlockBox ──────────────────────────────────────────────────────

/// Axis-aligned box of blocks with inclusive corners.
///
/// An empty box cannot be represented; construction from an empty
/// [`Extent`] yields `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockBox {
    /// Minimum corner (inclusive).
    pub min: BlockPos,
    /// Maximum corner (inclusive).
    pub max: BlockPos,
}

impl BlockBox {
    /// Box spanning `corner_a` and `corner_b`, in any order.
    pub fn spanning(corner_a: BlockPos, corner_b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(
                corner_a.x.min(corner_b.x),
                corner_a.y.min(corner_b.y),
                corner_a.z.min(corner_b.z),
            ),
            max: BlockPos::new(
                corner_a.x.max(corner_b.x),
                corner_a.y.max(corner_b.y),
                corner_a.z.max(corner_b.z),
            ),
        }
    }

    /// Box whose minimum corner is `origin` and whose size is `extent`.
    pub fn from_extent(origin: BlockPos, extent: Extent) -> Option<Self> {
        if extent.is_empty() {
            return None;
        }
        let far = BlockPos::new(
            origin.x.checked_add(i32::try_from(extent.x - 1).ok()?)?,
            origin.y.checked_add(i32::try_from(extent.y - 1).ok()?)?,
            origin.z.checked_add(i32::try_from(extent.z - 1).ok()?)?,
        );
        Some(Self {
            min: origin,
            max: far,
        })
    }

    /// Size of the box.
    pub fn extent(&self) -> Extent {
        Extent::new(
            (self.max.x - self.min.x + 1) as u32,
            (self.max.y - self.min.y + 1) as u32,
            (self.max.z - self.min.z + 1) as u32,
        )
    }

    /// `true` if `pos` lies inside the box.
    pub fn contains(&self, pos: BlockPos) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }

    /// `true` if `other` lies entirely inside this box.
    pub fn encloses(&self, other: &BlockBox) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    /// `true` if the two boxes share at least one block.
    pub fn intersects(&self, other: &BlockBox) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
            && self.min.z <= other.max.z
            && other.min.z <= self.max.z
    }

    /// The box grown by `margin` blocks on the four horizontal sides.
    /// The vertical span is left unchanged.
    pub fn inflate_horizontal(&self, margin: u32) -> Self {
        let m = i32::try_from(margin).unwrap_or(i32::MAX);
        Self {
            min: BlockPos::new(
                self.min.x.saturating_sub(m),
                self.min.y,
                self.min.z.saturating_sub(m),
            ),
            max: BlockPos::new(
                self.max.x.saturating_add(m),
                self.max.y,
                self.max.z.saturating_add(m),
            ),
        }
    }
}

impl fmt::Display for BlockBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.min, self.max)
    }
}

// ── Direction ─────────────────────────────────────────────────────

/// One of the six block faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// `-y`
    Down,
    /// `+y`
    Up,
    /// `-z`
    North,
    /// `+z`
    South,
    /// `-x`
    West,
    /// `+x`
    East,
}

impl Direction {
    /// The four horizontal directions in clockwise order starting at north.
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// All six directions.
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Unit offset of one step in this direction.
    pub fn unit(self) -> BlockPos {
        match self {
            Direction::Down => BlockPos::new(0, -1, 0),
            Direction::Up => BlockPos::new(0, 1, 0),
            Direction::North => BlockPos::new(0, 0, -1),
            Direction::South => BlockPos::new(0, 0, 1),
            Direction::West => BlockPos::new(-1, 0, 0),
            Direction::East => BlockPos::new(1, 0, 0),
        }
    }

    /// `true` for north, east, south and west.
    pub fn is_horizontal(self) -> bool {
        !matches!(self, Direction::Up | Direction::Down)
    }

    /// The opposite face.
    pub fn opposite(self) -> Self {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    /// Next horizontal direction clockwise. Vertical directions are fixed.
    pub fn clockwise(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
            vertical => vertical,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Down => "down",
            Direction::Up => "up",
            Direction::North => "north",
            Direction::South => "south",
            Direction::West => "west",
            Direction::East => "east",
        };
        f.write_str(name)
    }
}

// ── Rotation ──────────────────────────────────────────────────────

/// Clockwise quarter-turn rotation about the vertical axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Rotation {
    /// 0°
    #[default]
    None,
    /// 90° clockwise.
    Clockwise90,
    /// 180°.
    Clockwise180,
    /// 270° clockwise (90° counter-clockwise).
    CounterClockwise90,
}

impl Rotation {
    /// All four rotations in increasing angle.
    pub const ALL: [Rotation; 4] = [
        Rotation::None,
        Rotation::Clockwise90,
        Rotation::Clockwise180,
        Rotation::CounterClockwise90,
    ];

    /// Number of clockwise quarter turns (0..=3).
    pub fn quarter_turns(self) -> u8 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 1,
            Rotation::Clockwise180 => 2,
            Rotation::CounterClockwise90 => 3,
        }
    }

    /// Rotation from a number of clockwise quarter turns (taken modulo 4).
    pub fn from_quarter_turns(turns: u8) -> Self {
        Self::ALL[usize::from(turns % 4)]
    }

    /// Angle in degrees: 0, 90, 180 or 270.
    pub fn degrees(self) -> u32 {
        u32::from(self.quarter_turns()) * 90
    }

    /// Parse an angle in degrees. Only exact multiples of 90 below 360
    /// are accepted.
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Clockwise90),
            180 => Some(Rotation::Clockwise180),
            270 => Some(Rotation::CounterClockwise90),
            _ => None,
        }
    }

    /// The rotation that undoes this one.
    pub fn inverse(self) -> Self {
        Self::from_quarter_turns(4 - self.quarter_turns())
    }

    /// Apply `self` and then `then`.
    pub fn then(self, then: Rotation) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + then.quarter_turns())
    }

    /// Rotate a face. Up and down are fixed points.
    pub fn rotate_direction(self, direction: Direction) -> Direction {
        (0..self.quarter_turns()).fold(direction, |d, _| d.clockwise())
    }

    /// Rotate an offset about the y axis through the origin.
    pub fn rotate_offset(self, offset: BlockPos) -> BlockPos {
        let BlockPos { x, y, z } = offset;
        match self {
            Rotation::None => offset,
            Rotation::Clockwise90 => BlockPos::new(-z, y, x),
            Rotation::Clockwise180 => BlockPos::new(-x, y, -z),
            Rotation::CounterClockwise90 => BlockPos::new(z, y, -x),
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}
