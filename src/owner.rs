// src/owner.rs
//! Определение владельцев провинций
//!
//! Для каждой провинции берётся ровно одна точка стартовой карты — первый
//! пиксель региона в порядке построчного обхода (центроид вогнутого региона
//! может лежать вне его). Цвет в этой точке разрешается так:
//!
//! 1. альфа < 255 → метка «исключена из карты»;
//! 2. непрозрачный белый → метка «граница / нейтральная зона»;
//! 3. цвет есть в реестре наций → имя нации;
//! 4. иначе → детерминированная заглушка `Unknown_R_G_B` и предупреждение.
//!
//! Попутно собирается набор наций: первый встреченный цвет владельца занимает
//! слот, остальные провинции того же цвета его переиспользуют.

use crate::color::Color;
use crate::config::OwnerSettings;
use crate::error::{MapError, Result};
use crate::extract::Region;
use crate::province::{Province, ProvinceId};
use crate::raster::Raster;
use crate::registry::FactionRegistry;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::{info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OwnerKind {
    /// Нация из реестра
    Registered,
    /// Цвет без записи в реестре
    Fallback,
    /// Граница / нейтральная зона
    Border,
    /// Исключена из карты
    Excluded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub name: String,
    pub kind: OwnerKind,
}

impl Owner {
    /// Настоящий владелец (нация), а не служебная метка.
    #[must_use]
    pub fn is_faction(&self) -> bool {
        matches!(self.kind, OwnerKind::Registered | OwnerKind::Fallback)
    }
}

/// Нация: имя и цвет-подпись.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Faction {
    pub name: String,
    pub color: Color,
}

/// Итог разрешения владельцев
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Провинции по возрастанию идентификатора
    pub provinces: Vec<Province>,
    /// Нации в порядке первого появления
    pub factions: Vec<Faction>,
    /// Цвета стартовой карты без записи в реестре
    pub unmapped: BTreeSet<Color>,
}

/// Проверка парности растров; выполняется до первого прохода по пикселям.
pub fn check_dimensions(mask: &Raster, start: &Raster) -> Result<()> {
    if mask.dimensions() != start.dimensions() {
        return Err(MapError::DimensionMismatch {
            mask_width: mask.width,
            mask_height: mask.height,
            start_width: start.width,
            start_height: start.height,
        });
    }
    Ok(())
}

pub struct OwnerResolver<'a> {
    start: &'a Raster,
    registry: &'a FactionRegistry,
    settings: &'a OwnerSettings,
}

impl<'a> OwnerResolver<'a> {
    #[must_use]
    pub fn new(start: &'a Raster, registry: &'a FactionRegistry, settings: &'a OwnerSettings) -> Self {
        Self {
            start,
            registry,
            settings,
        }
    }

    /// Цвет и альфа стартовой карты в канонической точке региона.
    #[must_use]
    pub fn sample(&self, region: &Region) -> (Color, u8) {
        let (x, y) = region.first_pixel;
        (self.start.get(x, y), self.start.alpha_at(x, y))
    }

    #[must_use]
    pub fn resolve_sample(&self, color: Color, alpha: u8) -> Owner {
        let s = self.settings;
        if alpha < 255 {
            return Owner {
                name: s.excluded_label.clone(),
                kind: OwnerKind::Excluded,
            };
        }
        if color == Color::WHITE {
            return Owner {
                name: s.border_label.clone(),
                kind: OwnerKind::Border,
            };
        }
        match self.registry.name_of(color) {
            Some(name) => Owner {
                name: name.to_string(),
                kind: OwnerKind::Registered,
            },
            None => Owner {
                name: color.fallback_label(&s.fallback_prefix),
                kind: OwnerKind::Fallback,
            },
        }
    }

    /// Разрешает владельцев всех провинций. Выборка независима по регионам и при
    /// `parallel` идёт параллельно; набор наций собирается после, в порядке id.
    #[must_use]
    pub fn resolve(&self, numbered: Vec<(ProvinceId, Region)>, parallel: bool) -> Resolution {
        let resolve_one = |(id, region): (ProvinceId, Region)| {
            let (owner_color, alpha) = self.sample(&region);
            let owner = self.resolve_sample(owner_color, alpha);
            Province {
                id,
                region,
                owner,
                owner_color,
            }
        };

        #[cfg(feature = "parallel")]
        let provinces: Vec<Province> = if parallel {
            numbered.into_par_iter().map(resolve_one).collect()
        } else {
            numbered.into_iter().map(resolve_one).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let provinces: Vec<Province> = {
            let _ = parallel;
            numbered.into_iter().map(resolve_one).collect()
        };

        let mut factions = Vec::new();
        let mut slots = HashSet::new();
        let mut unmapped = BTreeSet::new();
        for p in &provinces {
            if p.owner.kind == OwnerKind::Fallback && unmapped.insert(p.owner_color) {
                warn!(
                    "Цвет владельца {} ({}) не найден в реестре наций, имя: {}",
                    p.owner_color, p.id, p.owner.name
                );
            }
            if p.owner.is_faction() && slots.insert(p.owner_color) {
                factions.push(Faction {
                    name: p.owner.name.clone(),
                    color: p.owner_color,
                });
            }
        }
        info!(
            "Владельцы определены: {} провинций, {} наций, {} неизвестных цветов",
            provinces.len(),
            factions.len(),
            unmapped.len()
        );

        Resolution {
            provinces,
            factions,
            unmapped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Bounds;

    fn region_at(x: u32, y: u32) -> Region {
        Region {
            color: Color::new(255, 0, 0),
            pixels: vec![(x, y)],
            pixel_count: 1,
            centroid: (x, y),
            first_pixel: (x, y),
            bounds: Bounds {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
            },
        }
    }

    fn start_with(pixels: &[((u32, u32), Color, u8)]) -> Raster {
        let mut start = Raster::new(4, 4, Color::BLACK);
        for &((x, y), color, alpha) in pixels {
            start.set(x, y, color);
            let idx = start.index(x, y);
            start.alpha[idx] = alpha;
        }
        start
    }

    #[test]
    fn unmapped_color_gets_fallback_label() {
        let start = start_with(&[((0, 0), Color::new(17, 17, 17), 255)]);
        let registry = FactionRegistry::default();
        let settings = OwnerSettings::default();
        let resolver = OwnerResolver::new(&start, &registry, &settings);
        let out = resolver.resolve(vec![(ProvinceId(1), region_at(0, 0))], false);
        let owner = &out.provinces[0].owner;
        assert_eq!(owner.kind, OwnerKind::Fallback);
        assert!(owner.name.contains("17_17_17"));
        assert_eq!(out.unmapped.len(), 1);
        assert_eq!(out.factions.len(), 1);
    }

    #[test]
    fn sentinels_take_priority_over_registry() {
        let start = start_with(&[
            ((0, 0), Color::WHITE, 255),
            ((1, 0), Color::new(220, 40, 40), 0),
            ((2, 0), Color::new(220, 40, 40), 255),
        ]);
        let registry = FactionRegistry::parse("Snow,255,255,255\nRoma,220,40,40\n");
        let settings = OwnerSettings::default();
        let resolver = OwnerResolver::new(&start, &registry, &settings);
        let out = resolver.resolve(
            vec![
                (ProvinceId(1), region_at(0, 0)),
                (ProvinceId(2), region_at(1, 0)),
                (ProvinceId(3), region_at(2, 0)),
            ],
            false,
        );
        let names: Vec<&str> = out.provinces.iter().map(|p| p.owner.name.as_str()).collect();
        assert_eq!(names, vec!["BORDER", "REMOVE_FROM_MAP", "Roma"]);
        // Служебные метки нациями не считаются
        assert_eq!(
            out.factions,
            vec![Faction {
                name: "Roma".into(),
                color: Color::new(220, 40, 40)
            }]
        );
        assert!(out.unmapped.is_empty());
    }

    #[test]
    fn samples_first_pixel_not_centroid() {
        let start = start_with(&[
            ((0, 0), Color::new(220, 40, 40), 255),
            ((2, 2), Color::new(40, 40, 220), 255),
        ]);
        let registry = FactionRegistry::parse("Roma,220,40,40\nCarthago,40,40,220\n");
        let settings = OwnerSettings::default();
        let mut region = region_at(0, 0);
        region.centroid = (2, 2);
        let resolver = OwnerResolver::new(&start, &registry, &settings);
        let out = resolver.resolve(vec![(ProvinceId(1), region)], false);
        assert_eq!(out.provinces[0].owner.name, "Roma");
    }

    #[test]
    fn faction_slot_is_shared_by_later_provinces() {
        let start = start_with(&[
            ((0, 0), Color::new(5, 6, 7), 255),
            ((1, 1), Color::new(5, 6, 7), 255),
        ]);
        let registry = FactionRegistry::default();
        let settings = OwnerSettings::default();
        let resolver = OwnerResolver::new(&start, &registry, &settings);
        let out = resolver.resolve(
            vec![
                (ProvinceId(1), region_at(0, 0)),
                (ProvinceId(2), region_at(1, 1)),
            ],
            false,
        );
        assert_eq!(out.factions.len(), 1);
        assert_eq!(out.unmapped.len(), 1);
        assert_eq!(out.provinces[0].owner, out.provinces[1].owner);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let mask = Raster::new(4, 4, Color::BLACK);
        let start = Raster::new(4, 5, Color::BLACK);
        assert!(matches!(
            check_dimensions(&mask, &start),
            Err(MapError::DimensionMismatch { .. })
        ));
        assert!(check_dimensions(&mask, &mask).is_ok());
    }
}
