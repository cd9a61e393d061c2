// src/synth/mod.rs
//! Синтез маски провинций
//!
//! Используется только тогда, когда авторской маски нет: даёт правдоподобную
//! тестовую/демонстрационную маску того же формата.
//!
//! ## Этапы
//!
//! 1. **Океан** — градиент по вертикали либо сплошной цвет фона.
//! 2. **Провинции** — `N` семян со случайным ярким цветом и радиусом:
//!    - `RadiusFill`: каждое семя рисует свой круг, наложения решает порядок
//!      рисования (последний побеждает) — отсюда рваные края, это ожидаемо;
//!    - `NearestSeed`: пиксель получает цвет ближайшего семени, если попадает
//!      в его радиус, иначе остаётся океаном. Полный перебор `O(w·h·N)`.
//! 3. **Острова** — небольшие круги поверх всего.
//! 4. **Полуострова** — луч с сужающейся полушириной поверх всего.
//!
//! Каждый следующий этап перезаписывает предыдущие. Всё детерминировано сидом.

use crate::color::Color;
use crate::config::{OceanStyle, SynthPolicy, SynthSettings};
use crate::raster::Raster;
use fastnoise_lite::{FastNoiseLite, NoiseType};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Семя провинции
#[derive(Debug, Clone, PartialEq)]
pub struct ProvinceSeed {
    pub x: i64,
    pub y: i64,
    pub radius: u32,
    pub color: Color,
}

pub struct MaskSynthesizer<'a> {
    settings: &'a SynthSettings,
    background: Color,
    parallel: bool,
}

impl<'a> MaskSynthesizer<'a> {
    #[must_use]
    pub fn new(settings: &'a SynthSettings, background: Color) -> Self {
        Self {
            settings,
            background,
            parallel: true,
        }
    }

    /// Заливка ближайшим семенем по строкам параллельно (нужна фича `parallel`).
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Синтезирует маску размером из настроек.
    #[must_use]
    pub fn synthesize(&self) -> Raster {
        self.synthesize_sized(self.settings.width, self.settings.height)
    }

    /// Синтезирует маску заданного размера (например, под стартовую карту).
    #[must_use]
    pub fn synthesize_sized(&self, width: u32, height: u32) -> Raster {
        let s = self.settings;
        let mut raster = self.ocean(width, height);
        if width == 0 || height == 0 {
            return raster;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(s.seed);

        info!(
            "Синтез маски {}×{}: {} семян ({:?})",
            width, height, s.num_seeds, s.policy
        );
        let seeds = self.generate_seeds(&mut rng, width, height);
        match s.policy {
            SynthPolicy::RadiusFill => radius_fill(&mut raster, &seeds),
            SynthPolicy::NearestSeed => {
                let noise = (s.coast_jitter.abs() > f32::EPSILON).then(|| coast_noise(s.seed));
                nearest_seed_fill(
                    &mut raster,
                    &seeds,
                    noise.as_ref().map(|n| (n, s.coast_jitter)),
                    self.parallel,
                );
            }
        }

        debug!("Острова: {}", s.islands);
        let island_margin = s.margin + s.margin / 2;
        for _ in 0..s.islands {
            let cx = coord(&mut rng, width, island_margin);
            let cy = coord(&mut rng, height, island_margin);
            let radius = rng.gen_range(s.island_radius_min..=s.island_radius_max);
            let color = random_color(&mut rng, s.color_floor);
            raster.paint_disc(cx, cy, i64::from(radius), color);
        }

        debug!("Полуострова: {}", s.peninsulas);
        let peninsula_margin = s.margin * 2;
        for _ in 0..s.peninsulas {
            let sx = coord(&mut rng, width, peninsula_margin);
            let sy = coord(&mut rng, height, peninsula_margin);
            let length = rng.gen_range(s.peninsula_length_min..=s.peninsula_length_max);
            let angle = rng.gen_range(0.0..std::f64::consts::TAU);
            let color = random_color(&mut rng, s.color_floor);
            paint_peninsula(
                &mut raster,
                (sx, sy),
                angle,
                length,
                (s.peninsula_half_width, s.peninsula_min_half_width),
                color,
            );
        }

        raster
    }

    fn ocean(&self, width: u32, height: u32) -> Raster {
        let mut raster = Raster::new(width, height, self.background);
        if self.settings.ocean == OceanStyle::Gradient {
            for y in 0..height {
                let color = gradient_color(y, height);
                for x in 0..width {
                    raster.set(x, y, color);
                }
            }
        }
        raster
    }

    fn generate_seeds(&self, rng: &mut ChaCha8Rng, width: u32, height: u32) -> Vec<ProvinceSeed> {
        let s = self.settings;
        (0..s.num_seeds)
            .map(|_| {
                let x = coord(rng, width, s.margin);
                let y = coord(rng, height, s.margin);
                let color = random_color(rng, s.color_floor);
                let radius = rng.gen_range(s.radius_min..=s.radius_max);
                ProvinceSeed {
                    x,
                    y,
                    radius,
                    color,
                }
            })
            .collect()
    }
}

/// Цвет океана в строке `y`: от тёмно-синего сверху к более светлому снизу.
#[must_use]
pub fn gradient_color(y: u32, height: u32) -> Color {
    let i = 15 + (u64::from(y) * 30 / u64::from(height.max(1))) as u8;
    Color::new(i, i + 15, i + 35)
}

/// Каждое семя закрашивает свой круг; при наложении побеждает последнее.
pub fn radius_fill(raster: &mut Raster, seeds: &[ProvinceSeed]) {
    for seed in seeds {
        raster.paint_disc(seed.x, seed.y, i64::from(seed.radius), seed.color);
    }
}

/// Пиксель получает цвет ближайшего семени, если лежит строго внутри его радиуса.
///
/// При равных расстояниях побеждает семя с меньшим индексом. С `jitter` радиус
/// семени модулируется шумом в точке пикселя.
pub fn nearest_seed_fill(
    raster: &mut Raster,
    seeds: &[ProvinceSeed],
    jitter: Option<(&FastNoiseLite, f32)>,
    parallel: bool,
) {
    if seeds.is_empty() || raster.width == 0 {
        return;
    }
    let width = raster.width as usize;

    let fill_row = |(y, row): (usize, &mut [Color])| {
        for (x, px) in row.iter_mut().enumerate() {
            if let Some(color) = nearest_within_radius(seeds, x as i64, y as i64, jitter) {
                *px = color;
            }
        }
    };

    #[cfg(feature = "parallel")]
    {
        if parallel {
            raster.data.par_chunks_mut(width).enumerate().for_each(fill_row);
            return;
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    raster.data.chunks_mut(width).enumerate().for_each(fill_row);
}

fn nearest_within_radius(
    seeds: &[ProvinceSeed],
    x: i64,
    y: i64,
    jitter: Option<(&FastNoiseLite, f32)>,
) -> Option<Color> {
    let mut best: Option<(&ProvinceSeed, i64)> = None;
    for seed in seeds {
        let (dx, dy) = (x - seed.x, y - seed.y);
        let d2 = dx * dx + dy * dy;
        if best.is_none_or(|(_, best_d2)| d2 < best_d2) {
            best = Some((seed, d2));
        }
    }
    let (seed, d2) = best?;
    let r = i64::from(seed.radius);
    let inside = match jitter {
        None => d2 < r * r,
        Some((noise, amount)) => {
            let factor = 1.0 + amount * noise.get_noise_2d(x as f32, y as f32);
            (d2 as f32).sqrt() < r as f32 * factor
        }
    };
    inside.then_some(seed.color)
}

/// Луч от `start` под углом `angle`; на шаге `i` рисуется круг полушириной
/// `max(min_half, half - i / 10)`.
pub fn paint_peninsula(
    raster: &mut Raster,
    start: (i64, i64),
    angle: f64,
    length: u32,
    (half, min_half): (u32, u32),
    color: Color,
) {
    let (sin, cos) = angle.sin_cos();
    for i in 0..length {
        let x = (start.0 as f64 + f64::from(i) * cos) as i64;
        let y = (start.1 as f64 + f64::from(i) * sin) as i64;
        let w = half.saturating_sub(i / 10).max(min_half);
        raster.paint_disc(x, y, i64::from(w), color);
    }
}

fn coast_noise(seed: u64) -> FastNoiseLite {
    let mut noise = FastNoiseLite::new();
    noise.set_seed(Some(seed.wrapping_add(3_000_000) as i32));
    noise.set_noise_type(Some(NoiseType::OpenSimplex2));
    noise.set_frequency(Some(0.02));
    noise
}

/// Случайная координата в `[margin, extent - 1 - margin]`; отступ ужимается на малых холстах.
fn coord(rng: &mut ChaCha8Rng, extent: u32, margin: u32) -> i64 {
    let m = margin.min(extent.saturating_sub(1) / 2);
    let hi = extent.saturating_sub(1).saturating_sub(m);
    i64::from(rng.gen_range(m..=hi))
}

fn random_color(rng: &mut ChaCha8Rng, floor: u8) -> Color {
    // Ноль запрещён: иначе может выпасть чёрный фон
    let floor = floor.max(1);
    Color::new(
        rng.gen_range(floor..=255),
        rng.gen_range(floor..=255),
        rng.gen_range(floor..=255),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_settings() -> SynthSettings {
        SynthSettings {
            width: 120,
            height: 80,
            num_seeds: 12,
            margin: 10,
            radius_min: 8,
            radius_max: 20,
            islands: 3,
            island_radius_min: 2,
            island_radius_max: 4,
            peninsulas: 2,
            peninsula_length_min: 10,
            peninsula_length_max: 20,
            peninsula_half_width: 4,
            peninsula_min_half_width: 1,
            seed: 7,
            ..SynthSettings::default()
        }
    }

    #[test]
    fn same_seed_same_mask() {
        let settings = small_settings();
        let a = MaskSynthesizer::new(&settings, Color::BLACK).synthesize();
        let b = MaskSynthesizer::new(&settings, Color::BLACK).synthesize();
        assert_eq!(a, b);

        let other = SynthSettings {
            seed: 8,
            ..small_settings()
        };
        let c = MaskSynthesizer::new(&other, Color::BLACK).synthesize();
        assert_ne!(a, c);
    }

    #[test]
    fn sequential_fill_matches_parallel_fill() {
        let settings = SynthSettings {
            coast_jitter: 0.3,
            ..small_settings()
        };
        let par = MaskSynthesizer::new(&settings, Color::BLACK).synthesize();
        let seq = MaskSynthesizer::new(&settings, Color::BLACK)
            .with_parallel(false)
            .synthesize();
        assert_eq!(par, seq);
    }

    #[test]
    fn radius_fill_last_seed_wins() {
        let mut raster = Raster::new(20, 20, Color::BLACK);
        let red = Color::new(255, 0, 0);
        let blue = Color::new(0, 0, 255);
        radius_fill(
            &mut raster,
            &[
                ProvinceSeed { x: 8, y: 10, radius: 5, color: red },
                ProvinceSeed { x: 12, y: 10, radius: 5, color: blue },
            ],
        );
        // Точка (10,10) внутри обоих кругов
        assert_eq!(raster.get(10, 10), blue);
        assert_eq!(raster.get(4, 10), red);
    }

    #[test]
    fn nearest_seed_respects_own_radius() {
        let mut raster = Raster::new(30, 10, Color::BLACK);
        let big = Color::new(200, 200, 100);
        let small = Color::new(100, 200, 200);
        nearest_seed_fill(
            &mut raster,
            &[
                ProvinceSeed { x: 5, y: 5, radius: 20, color: big },
                ProvinceSeed { x: 20, y: 5, radius: 2, color: small },
            ],
            None,
            false,
        );
        // (15,5) ближе к малому семени, но вне его радиуса: остаётся океаном,
        // хотя и попадает в радиус большого
        assert_eq!(raster.get(15, 5), Color::BLACK);
        assert_eq!(raster.get(12, 5), big);
        assert_eq!(raster.get(21, 5), small);
        assert_eq!(raster.get(20, 5), small);
    }

    #[test]
    fn background_ocean_stays_background() {
        let settings = SynthSettings {
            ocean: OceanStyle::Background,
            num_seeds: 0,
            islands: 0,
            peninsulas: 0,
            ..small_settings()
        };
        let raster = MaskSynthesizer::new(&settings, Color::BLACK).synthesize();
        assert!(raster.data.iter().all(|&c| c == Color::BLACK));
    }

    #[test]
    fn gradient_ocean_never_collides_with_black() {
        let settings = SynthSettings {
            num_seeds: 0,
            islands: 0,
            peninsulas: 0,
            ..small_settings()
        };
        let raster = MaskSynthesizer::new(&settings, Color::BLACK).synthesize();
        assert_eq!(raster.get(0, 0), Color::new(15, 30, 50));
        assert!(raster.data.iter().all(|&c| c != Color::BLACK));
    }

    #[test]
    fn peninsula_tapers_along_the_ray() {
        let mut raster = Raster::new(100, 40, Color::BLACK);
        let c = Color::new(150, 150, 150);
        paint_peninsula(&mut raster, (5, 20), 0.0, 80, (6, 2), c);
        let column_height = |x: u32| (0..40).filter(|&y| raster.get(x, y) == c).count();
        assert!(column_height(5) > column_height(80));
        assert!(column_height(80) > 0);
    }

    #[test]
    fn tiny_canvas_does_not_panic() {
        let settings = SynthSettings {
            width: 3,
            height: 2,
            ..small_settings()
        };
        let raster = MaskSynthesizer::new(&settings, Color::BLACK).synthesize();
        assert_eq!(raster.dimensions(), (3, 2));
    }
}
