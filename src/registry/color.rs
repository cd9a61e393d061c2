// src/registry/color.rs
//! Реестр цветов провинций
//!
//! Идентификаторы назначаются **после** того, как собраны все цвета: набор
//! сортируется по (R, G, B) и нумеруется подряд. Порядок обнаружения (а при
//! параллельной обработке он случаен) на нумерацию не влияет.
//!
//! ```
//! use provmap::{Color, registry::ColorRegistryBuilder};
//!
//! let mut builder = ColorRegistryBuilder::default();
//! builder.observe(Color::new(0, 0, 255));
//! builder.observe(Color::new(255, 0, 0));
//! builder.observe(Color::new(0, 0, 255));
//! let registry = builder.build();
//!
//! assert_eq!(registry.id_of(Color::new(0, 0, 255)).unwrap(), 0);
//! assert_eq!(registry.color_of(1).unwrap(), Color::new(255, 0, 0));
//! ```

use crate::color::Color;
use crate::error::{MapError, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Накопитель цветов до назначения идентификаторов.
#[derive(Debug, Clone, Default)]
pub struct ColorRegistryBuilder {
    seen: BTreeSet<Color>,
}

impl ColorRegistryBuilder {
    /// Отмечает цвет как встреченный; повторы игнорируются.
    pub fn observe(&mut self, color: Color) {
        self.seen.insert(color);
    }

    /// Сливает частичный результат другого обработчика (дедупликация по цвету).
    pub fn merge(&mut self, other: ColorRegistryBuilder) {
        self.seen.extend(other.seen);
    }

    #[must_use]
    pub fn build(self) -> ColorRegistry {
        let colors: Vec<Color> = self.seen.into_iter().collect();
        let index = colors
            .iter()
            .enumerate()
            .map(|(i, &c)| (c, i as u32))
            .collect();
        ColorRegistry { colors, index }
    }
}

impl Extend<Color> for ColorRegistryBuilder {
    fn extend<T: IntoIterator<Item = Color>>(&mut self, iter: T) {
        self.seen.extend(iter);
    }
}

/// Двунаправленное отображение цвет ↔ порядковый номер (с нуля).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorRegistry {
    colors: Vec<Color>,
    index: BTreeMap<Color, u32>,
}

impl ColorRegistry {
    #[must_use]
    pub fn from_colors<I: IntoIterator<Item = Color>>(colors: I) -> Self {
        let mut builder = ColorRegistryBuilder::default();
        builder.extend(colors);
        builder.build()
    }

    pub fn id_of(&self, color: Color) -> Result<u32> {
        self.index
            .get(&color)
            .copied()
            .ok_or_else(|| MapError::KeyNotFound(format!("color {color}")))
    }

    pub fn color_of(&self, id: u32) -> Result<Color> {
        self.colors
            .get(id as usize)
            .copied()
            .ok_or_else(|| MapError::KeyNotFound(format!("color id {id}")))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Цвета в каноническом порядке.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Color)> + '_ {
        self.colors.iter().enumerate().map(|(i, &c)| (i as u32, c))
    }
}
