// src/color.rs
//! Цвет как ключ идентичности
//!
//! Все сопоставления «цвет → провинция» и «цвет → нация» используют `Color`
//! в качестве ключа. Порядок — лексикографический по (R, G, B); именно он
//! задаёт детерминированную нумерацию провинций.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Цвет пикселя: три 8-битных канала. Равенство — точное покомпонентное.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Чёрный — фон маски по умолчанию.
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[must_use]
    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    #[must_use]
    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }

    /// Непрозрачный ARGB, как его ожидает JVM-клиент (`0xFFrrggbb`).
    #[must_use]
    pub fn to_argb(self) -> u32 {
        (0xFF << 24) | (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    /// `"#rrggbb"`
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Детерминированное имя для цвета, которого нет в реестре наций.
    ///
    /// ```
    /// use provmap::Color;
    /// assert_eq!(Color::new(17, 17, 17).fallback_label("Unknown"), "Unknown_17_17_17");
    /// ```
    #[must_use]
    pub fn fallback_label(self, prefix: &str) -> String {
        format!("{prefix}_{}_{}_{}", self.r, self.g, self.b)
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Color> for [u8; 3] {
    fn from(c: Color) -> Self {
        c.to_array()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_lexicographic_by_channel() {
        let mut colors = vec![
            Color::new(0, 0, 255),
            Color::new(255, 0, 0),
            Color::new(0, 255, 0),
            Color::new(0, 0, 254),
        ];
        colors.sort();
        assert_eq!(
            colors,
            vec![
                Color::new(0, 0, 254),
                Color::new(0, 0, 255),
                Color::new(0, 255, 0),
                Color::new(255, 0, 0),
            ]
        );
    }

    #[test]
    fn argb_matches_jvm_layout() {
        let c = Color::new(0x12, 0x34, 0x56);
        assert_eq!(c.to_argb(), 0xFF12_3456);
        assert_eq!(c.to_hex(), "#123456");
    }

    #[test]
    fn serializes_as_triple() {
        let json = serde_json::to_string(&Color::new(1, 2, 3)).unwrap();
        assert_eq!(json, "[1,2,3]");
        let back: Color = serde_json::from_str("[200,100,50]").unwrap();
        assert_eq!(back, Color::new(200, 100, 50));
    }
}
