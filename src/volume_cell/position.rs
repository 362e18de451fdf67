use smallvec::SmallVec;

/// A cutting field: one of the interfaces a session can be cut by.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum CutField {
    /// The zero iso-surface of the nodal level-set.
    LevelSet,
    /// The explicit cut side mesh.
    Sides,
}

/// The position of a volume cell, node or point relative to a cutting field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum Position {
    /// Negative level-set, or behind the cut sides (opposite to their normal).
    Inside,
    /// Positive level-set, or in front of the cut sides.
    Outside,
    /// On the interface itself.
    OnCutSurface,
    /// Not determined yet.
    Undecided,
}

impl Position {
    /// The position of a signed value w.r.t. a tolerance.
    #[inline]
    pub fn from_signed(value: crate::math::Real, tolerance: crate::math::Real) -> Self {
        if value < -tolerance {
            Position::Inside
        } else if value > tolerance {
            Position::Outside
        } else {
            Position::OnCutSurface
        }
    }
}

/// One position per cutting field.
pub type Positions = SmallVec<[(CutField, Position); 2]>;
