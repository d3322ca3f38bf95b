//! Socket values flowing along links.
//!
//! [`GeometrySet`] is a shared, immutable point list. Cloning bumps a
//! reference count, so cached frames are published without copying.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The data type carried by a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocketType {
    Float,
    Geometry,
}

impl SocketType {
    /// The value an unlinked input or an unpublished output falls back to.
    pub fn default_value(self) -> SocketValue {
        match self {
            SocketType::Float => SocketValue::Float(0.0),
            SocketType::Geometry => SocketValue::Geometry(GeometrySet::default()),
        }
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketType::Float => write!(f, "Float"),
            SocketType::Geometry => write!(f, "Geometry"),
        }
    }
}

/// An immutable set of points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometrySet {
    points: Arc<[[f32; 3]]>,
}

impl GeometrySet {
    pub fn from_points(points: Vec<[f32; 3]>) -> Self {
        GeometrySet {
            points: points.into(),
        }
    }

    pub fn points(&self) -> &[[f32; 3]] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns a new set with every point moved by `offset`.
    pub fn translated(&self, offset: [f32; 3]) -> Self {
        let points = self
            .points
            .iter()
            .map(|p| [p[0] + offset[0], p[1] + offset[1], p[2] + offset[2]])
            .collect::<Vec<_>>();
        GeometrySet::from_points(points)
    }

    /// Returns `true` if both sets share the same allocation.
    pub fn ptr_eq(&self, other: &GeometrySet) -> bool {
        Arc::ptr_eq(&self.points, &other.points)
    }
}

/// A runtime socket value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum SocketValue {
    Float(f32),
    Geometry(GeometrySet),
}

impl SocketValue {
    pub fn socket_type(&self) -> SocketType {
        match self {
            SocketValue::Float(_) => SocketType::Float,
            SocketValue::Geometry(_) => SocketType::Geometry,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            SocketValue::Float(v) => Some(*v),
            SocketValue::Geometry(_) => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&GeometrySet> {
        match self {
            SocketValue::Geometry(g) => Some(g),
            SocketValue::Float(_) => None,
        }
    }

    pub fn into_geometry(self) -> Option<GeometrySet> {
        match self {
            SocketValue::Geometry(g) => Some(g),
            SocketValue::Float(_) => None,
        }
    }
}

impl From<f32> for SocketValue {
    fn from(v: f32) -> Self {
        SocketValue::Float(v)
    }
}

impl From<GeometrySet> for SocketValue {
    fn from(g: GeometrySet) -> Self {
        SocketValue::Geometry(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_per_type() {
        assert_eq!(SocketType::Float.default_value(), SocketValue::Float(0.0));
        let geometry = SocketType::Geometry.default_value();
        assert!(geometry.as_geometry().unwrap().is_empty());
    }

    #[test]
    fn clone_shares_points() {
        let a = GeometrySet::from_points(vec![[1.0, 2.0, 3.0]]);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn translate_moves_every_point() {
        let g = GeometrySet::from_points(vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]);
        let moved = g.translated([0.0, 0.0, 2.0]);
        assert_eq!(moved.points(), &[[0.0, 0.0, 2.0], [1.0, 1.0, 3.0]]);
        assert!(!moved.ptr_eq(&g));
    }

    #[test]
    fn socket_value_serde_roundtrip() {
        let v = SocketValue::Geometry(GeometrySet::from_points(vec![[0.5, 0.0, -1.0]]));
        let json = serde_json::to_string(&v).unwrap();
        let back: SocketValue = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
