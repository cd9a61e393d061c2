// src/extract/mod.rs
//! Выделение регионов из маски провинций
//!
//! Регион — максимальное связное множество пикселей одного цвета. Пиксели
//! разных цветов не объединяются, даже если соседствуют; два несвязанных пятна
//! одного цвета — два разных региона. Компоненты меньше `min_size` отбрасываются
//! целиком (к соседям не присоединяются).
//!
//! Порядок регионов на выходе канонический: по цвету, затем по центроиду (y, x),
//! затем по первому пикселю — и не зависит от порядка обхода или числа полос.

pub mod label;

use crate::color::Color;
use crate::config::ExtractSettings;
use crate::raster::Raster;
use crate::registry::ColorRegistry;
use label::{Labeling, label_components, mask_color};
use std::collections::HashMap;
use tracing::{debug, info};

/// Ограничивающий прямоугольник (включительно).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Bounds {
    fn point(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }
}

/// Связная компонента маски. Пересчитывается при каждом запуске.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub color: Color,
    /// Пиксели в порядке построчного обхода
    pub pixels: Vec<(u32, u32)>,
    pub pixel_count: usize,
    /// Среднее координат, округлённое до целого
    pub centroid: (u32, u32),
    /// Первый пиксель при обходе сверху вниз, слева направо
    pub first_pixel: (u32, u32),
    pub bounds: Bounds,
}

impl Region {
    /// Ключ канонического порядка регионов.
    #[must_use]
    pub fn order_key(&self) -> (Color, u32, u32, u32, u32) {
        (
            self.color,
            self.centroid.1,
            self.centroid.0,
            self.first_pixel.1,
            self.first_pixel.0,
        )
    }
}

/// Результат выделения
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Выжившие регионы в каноническом порядке
    pub regions: Vec<Region>,
    /// Сколько компонент отброшено как слишком мелкие
    pub dropped: usize,
    /// Все нефоновые цвета маски, включая цвета отброшенных компонент
    pub colors: ColorRegistry,
}

pub struct RegionExtractor<'a> {
    settings: &'a ExtractSettings,
}

impl<'a> RegionExtractor<'a> {
    #[must_use]
    pub fn new(settings: &'a ExtractSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn extract(&self, mask: &Raster) -> Extraction {
        let s = self.settings;
        let Labeling { labels, colors } = label_components(
            mask,
            s.background,
            s.connectivity,
            s.band_rows,
            s.parallel,
        );
        let colors = colors.build();

        let mut components = collect_components(mask, &labels, s.background);
        let total = components.len();
        components.retain(|r| r.pixel_count >= s.min_size);
        let dropped = total - components.len();
        components.sort_by_key(Region::order_key);

        info!(
            "Выделено регионов: {} (цветов: {}, отброшено мелких: {})",
            components.len(),
            colors.len(),
            dropped
        );

        Extraction {
            regions: components,
            dropped,
            colors,
        }
    }
}

struct Accumulator {
    color: Color,
    pixels: Vec<(u32, u32)>,
    sum_x: u64,
    sum_y: u64,
    bounds: Bounds,
}

/// Один построчный проход: метка → регион. Первый пиксель каждого региона —
/// первый в порядке обхода.
fn collect_components(mask: &Raster, labels: &[u32], background: Color) -> Vec<Region> {
    let width = mask.width as usize;
    let mut by_label: HashMap<u32, usize> = HashMap::new();
    let mut acc: Vec<Accumulator> = Vec::new();

    for (idx, &label) in labels.iter().enumerate() {
        if label == 0 {
            continue;
        }
        let (x, y) = ((idx % width) as u32, (idx / width) as u32);
        let slot = *by_label.entry(label).or_insert_with(|| {
            acc.push(Accumulator {
                color: mask_color(mask, idx, background),
                pixels: Vec::new(),
                sum_x: 0,
                sum_y: 0,
                bounds: Bounds::point(x, y),
            });
            acc.len() - 1
        });
        let a = &mut acc[slot];
        a.pixels.push((x, y));
        a.sum_x += u64::from(x);
        a.sum_y += u64::from(y);
        a.bounds.include(x, y);
    }
    debug!("Связных компонент до фильтрации: {}", acc.len());

    acc.into_iter()
        .map(|a| {
            let n = a.pixels.len();
            let centroid = (mean(a.sum_x, n), mean(a.sum_y, n));
            Region {
                color: a.color,
                first_pixel: a.pixels[0],
                pixel_count: n,
                centroid,
                bounds: a.bounds,
                pixels: a.pixels,
            }
        })
        .collect()
}

fn mean(sum: u64, n: usize) -> u32 {
    (sum as f64 / n as f64).round() as u32
}
