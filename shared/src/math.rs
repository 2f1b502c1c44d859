use serde::{Deserialize, Serialize};

/// A 2D world position or direction. Serialized as two little-endian f64s.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

pub const V2_ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn lerp(self, target: Vec2, t: f64) -> Vec2 {
        Vec2 {
            x: lerp(self.x, target.x, t),
            y: lerp(self.y, target.y, t),
        }
    }

    pub fn distance_to(self, other: Vec2) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// An RGBA color as it appears in a position snapshot. Cosmetic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_lerp_endpoints() {
        assert_approx_eq!(lerp(2.0, 10.0, 0.0), 2.0);
        assert_approx_eq!(lerp(2.0, 10.0, 1.0), 10.0);
        assert_approx_eq!(lerp(2.0, 10.0, 0.5), 6.0);
    }

    #[test]
    fn test_vec2_lerp() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(4.0, -8.0);
        let mid = a.lerp(b, 0.5);
        assert_approx_eq!(mid.x, 2.0);
        assert_approx_eq!(mid.y, -4.0);
    }

    #[test]
    fn test_vec2_distance() {
        let a = Vec2::new(1.0, 1.0);
        let b = Vec2::new(4.0, 5.0);
        assert_approx_eq!(a.distance_to(b), 5.0);
    }

    #[test]
    fn test_wire_sizes() {
        // The documented payload layouts rely on these exact encodings.
        let v = bincode::serialize(&Vec2::new(1.0, 2.0)).unwrap();
        assert_eq!(v.len(), 16);

        let c = bincode::serialize(&Color::WHITE).unwrap();
        assert_eq!(c.len(), 4);
    }
}
