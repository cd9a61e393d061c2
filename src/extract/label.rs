// src/extract/label.rs
//! Разметка связных компонент по полосам строк
//!
//! Растр режется на горизонтальные полосы по `band_rows` строк. Каждая полоса
//! размечается независимо (`imageproc::region_labelling`), метки сдвигаются в
//! общее пространство, после чего компоненты, пересекающие шов между полосами,
//! склеиваются через `UnionFind`. Результат не зависит от числа полос.
//!
//! Соседние пиксели объединяются только при точном совпадении цвета, поэтому
//! разметка всего растра за один проход эквивалентна разметке каждого цвета по
//! отдельности.

use crate::color::Color;
use crate::config::Connectivity;
use crate::raster::Raster;
use crate::registry::ColorRegistryBuilder;
use image::{Rgb, RgbImage};
use imageproc::region_labelling::{self, connected_components};
use petgraph::unionfind::UnionFind;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Результат разметки: метка на каждый пиксель (0 — фон) и все встреченные цвета.
pub struct Labeling {
    pub labels: Vec<u32>,
    pub colors: ColorRegistryBuilder,
}

struct BandLabels {
    labels: Vec<u32>,
    max_label: u32,
    colors: ColorRegistryBuilder,
}

/// Цвет пикселя маски с учётом альфы: полупрозрачные пиксели считаются фоном.
#[must_use]
pub fn mask_color(mask: &Raster, idx: usize, background: Color) -> Color {
    if mask.alpha[idx] < 255 {
        background
    } else {
        mask.data[idx]
    }
}

pub fn label_components(
    mask: &Raster,
    background: Color,
    connectivity: Connectivity,
    band_rows: u32,
    parallel: bool,
) -> Labeling {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return Labeling {
            labels: Vec::new(),
            colors: ColorRegistryBuilder::default(),
        };
    }

    let band_rows = band_rows.max(1);
    let bands: Vec<(u32, u32)> = (0..height)
        .step_by(band_rows as usize)
        .map(|start| (start, (start + band_rows).min(height)))
        .collect();

    let bands_out = label_bands(mask, &bands, background, connectivity, parallel);

    // Сдвиг локальных меток в общее пространство
    let mut labels = Vec::with_capacity(mask.data.len());
    let mut colors = ColorRegistryBuilder::default();
    let mut offset = 0u32;
    for band in bands_out {
        labels.extend(
            band.labels
                .iter()
                .map(|&l| if l == 0 { 0 } else { l + offset }),
        );
        offset += band.max_label;
        colors.merge(band.colors);
    }

    if bands.len() > 1 {
        stitch_seams(mask, &mut labels, &bands, offset, background, connectivity);
    }

    Labeling { labels, colors }
}

fn label_bands(
    mask: &Raster,
    bands: &[(u32, u32)],
    background: Color,
    connectivity: Connectivity,
    parallel: bool,
) -> Vec<BandLabels> {
    let run = |&(start, end): &(u32, u32)| label_band(mask, start, end, background, connectivity);

    #[cfg(feature = "parallel")]
    {
        if parallel && bands.len() > 1 {
            return bands.par_iter().map(run).collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    bands.iter().map(run).collect()
}

fn label_band(
    mask: &Raster,
    start: u32,
    end: u32,
    background: Color,
    connectivity: Connectivity,
) -> BandLabels {
    let mut colors = ColorRegistryBuilder::default();
    let band = RgbImage::from_fn(mask.width, end - start, |x, y| {
        let c = mask_color(mask, mask.index(x, start + y), background);
        if c != background {
            colors.observe(c);
        }
        Rgb(c.to_array())
    });

    let conn = match connectivity {
        Connectivity::Four => region_labelling::Connectivity::Four,
        Connectivity::Eight => region_labelling::Connectivity::Eight,
    };
    let labels = connected_components(&band, conn, Rgb(background.to_array())).into_raw();
    let max_label = labels.iter().copied().max().unwrap_or(0);

    BandLabels {
        labels,
        max_label,
        colors,
    }
}

/// Склеивает компоненты, касающиеся друг друга через границу соседних полос.
fn stitch_seams(
    mask: &Raster,
    labels: &mut [u32],
    bands: &[(u32, u32)],
    label_count: u32,
    background: Color,
    connectivity: Connectivity,
) {
    let width = mask.width as usize;
    let mut uf = UnionFind::<u32>::new(label_count as usize + 1);

    for &(seam, _) in bands.iter().skip(1) {
        let above = (seam as usize - 1) * width;
        let below = seam as usize * width;
        for x in 0..width {
            let a = labels[above + x];
            if a == 0 {
                continue;
            }
            let color = mask_color(mask, above + x, background);
            let lo = if connectivity == Connectivity::Eight { x.saturating_sub(1) } else { x };
            let hi = if connectivity == Connectivity::Eight { (x + 1).min(width - 1) } else { x };
            for nx in lo..=hi {
                let b = labels[below + nx];
                if b != 0 && mask_color(mask, below + nx, background) == color {
                    uf.union(a, b);
                }
            }
        }
    }

    for label in labels.iter_mut().filter(|l| **l != 0) {
        *label = uf.find_mut(*label);
    }
}
