//! Tree node types.

use super::leaf::LinearUnit;
use super::NodeId;

/// Operator of a combination node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operator {
    /// Take the smallest child value. Produces concave pieces.
    Min = 0,
    /// Take the largest child value. Produces convex pieces.
    Max = 1,
}

impl Operator {
    /// Whether `candidate` strictly beats `current` under this operator.
    ///
    /// Strict comparison means that ties keep the earlier child.
    #[inline]
    pub fn prefers(self, candidate: f64, current: f64) -> bool {
        match self {
            Operator::Min => candidate < current,
            Operator::Max => candidate > current,
        }
    }

    /// Combine two values, with an optional quadratic fillet of width `smoothing`.
    ///
    /// With `smoothing == 0` this is plain `min`/`max`. Otherwise, when the two
    /// values are within `smoothing` of each other the corner is rounded:
    /// `min(a, b) - (s - |a - b|)^2 / (4s)` (symmetric for MAX).
    #[inline]
    pub fn combine(self, a: f64, b: f64, smoothing: f64) -> f64 {
        let gap = (a - b).abs();
        let fillet = if smoothing > 0.0 && gap < smoothing {
            let t = smoothing - gap;
            t * t / (4.0 * smoothing)
        } else {
            0.0
        };
        match self {
            Operator::Min => a.min(b) - fillet,
            Operator::Max => a.max(b) + fillet,
        }
    }

    /// The other operator.
    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            Operator::Min => Operator::Max,
            Operator::Max => Operator::Min,
        }
    }
}

impl TryFrom<u8> for Operator {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Operator::Min),
            1 => Ok(Operator::Max),
            other => Err(other),
        }
    }
}

/// An interior node: an operator applied to an ordered list of children.
///
/// The children are owned exclusively by this node.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    pub op: Operator,
    pub children: Vec<NodeId>,
}

/// A node of the arena.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Combination(Combination),
    Leaf(LinearUnit),
}

impl Node {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    #[inline]
    pub fn as_leaf(&self) -> Option<&LinearUnit> {
        match self {
            Node::Leaf(unit) => Some(unit),
            Node::Combination(_) => None,
        }
    }

    #[inline]
    pub fn as_leaf_mut(&mut self) -> Option<&mut LinearUnit> {
        match self {
            Node::Leaf(unit) => Some(unit),
            Node::Combination(_) => None,
        }
    }
}
