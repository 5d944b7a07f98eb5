//! Facial landmark sets as produced by a face mesh detector.
//!
//! Coordinates are normalized: X and Y are in range 0.0 to 1.0 relative to the width and height of
//! the analyzed frame, with Y pointing *down*. The Z coordinate is carried along but not used by
//! any of the analysis in this crate.

/// A landmark position: `[x, y, z]`.
pub type Position = [f32; 3];

/// Number of landmarks in a refined face mesh (468 mesh vertices plus 10 iris landmarks).
pub const NUM_LANDMARKS: usize = 478;

/// An ordered, index-addressable set of facial landmarks.
///
/// Index identity is fixed by the detector: the landmark at [`LandmarkIdx::NoseTip`] is always the
/// tip of the nose, and so on.
#[derive(Debug, Clone, PartialEq)]
pub struct Landmarks {
    positions: Box<[Position]>,
}

impl Landmarks {
    /// Creates a new [`Landmarks`] collection containing `len` preallocated landmarks.
    ///
    /// All landmarks will start with all coordinates at `0.0`.
    pub fn new(len: usize) -> Self {
        Self {
            positions: vec![[0.0, 0.0, 0.0]; len].into_boxed_slice(),
        }
    }

    /// Creates a landmark set from a list of positions.
    pub fn from_positions(positions: impl Into<Box<[Position]>>) -> Self {
        Self {
            positions: positions.into(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Landmark> + Clone + '_ {
        self.positions.iter().map(|&pos| Landmark::new(pos))
    }

    /// Returns the landmark at `index`, or [`None`] if the set is too short.
    pub fn get(&self, index: impl Into<usize>) -> Option<Landmark> {
        self.positions.get(index.into()).map(|&pos| Landmark::new(pos))
    }

    pub fn set(&mut self, index: usize, landmark: Landmark) {
        self.positions[index] = landmark.pos;
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [Position] {
        &mut self.positions
    }

    pub fn map_positions(&mut self, mut f: impl FnMut(Position) -> Position) {
        for pos in self.positions_mut() {
            *pos = f(*pos);
        }
    }
}

/// A single landmark.
#[derive(Debug, PartialEq, PartialOrd, Clone, Copy)]
pub struct Landmark {
    pos: Position,
}

impl Landmark {
    pub fn new(position: Position) -> Self {
        Self { pos: position }
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.pos
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.pos[0]
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.pos[1]
    }

    #[inline]
    pub fn z(&self) -> f32 {
        self.pos[2]
    }
}

/// Assigns a name to the landmark indices the analysis depends on.
///
/// "Left" and "Right" are relative to the input image, not from the PoV of the depicted person.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    NoseTip = 1,
    LeftEyeOuterCorner = 33,
    MouthLeft = 61,
    RightEyeOuterCorner = 263,
    MouthRight = 291,
}

impl From<LandmarkIdx> for usize {
    #[inline]
    fn from(idx: LandmarkIdx) -> usize {
        idx as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_out_of_range() {
        let lms = Landmarks::new(2);
        assert!(lms.get(LandmarkIdx::NoseTip).is_some());
        assert!(lms.get(LandmarkIdx::LeftEyeOuterCorner).is_none());
        assert!(Landmarks::new(0).is_empty());
    }

    #[test]
    fn set_and_map() {
        let mut lms = Landmarks::new(3);
        lms.set(1, Landmark::new([0.5, 0.25, 1.0]));
        lms.map_positions(|[x, y, z]| [x * 2.0, y * 2.0, z]);
        let nose = lms.get(LandmarkIdx::NoseTip).unwrap();
        assert_eq!(nose.x(), 1.0);
        assert_eq!(nose.y(), 0.5);
        assert_eq!(nose.z(), 1.0);
        assert_eq!(lms.iter().count(), 3);
    }
}
