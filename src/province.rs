// src/province.rs
use crate::color::Color;
use crate::error::Result;
use crate::extract::Region;
use crate::owner::Owner;
use crate::registry::ColorRegistry;
use serde::{Serialize, Serializer};
use std::fmt;

/// Стабильный идентификатор провинции: `province_NNNN`, нумерация с единицы.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProvinceId(pub u32);

impl fmt::Display for ProvinceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "province_{:04}", self.0)
    }
}

impl Serialize for ProvinceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Регион с присвоенным идентификатором и владельцем.
#[derive(Debug, Clone, PartialEq)]
pub struct Province {
    pub id: ProvinceId,
    pub region: Region,
    pub owner: Owner,
    /// Цвет стартовой карты в точке выборки
    pub owner_color: Color,
}

impl Province {
    #[must_use]
    pub fn color(&self) -> Color {
        self.region.color
    }

    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.region.pixel_count
    }

    #[must_use]
    pub fn centroid(&self) -> (u32, u32) {
        self.region.centroid
    }
}

/// Нумерует регионы: по номеру цвета в реестре, регионы одного цвета — по
/// центроиду (y, x), затем по первому пикселю.
pub fn assign_ids(
    regions: Vec<Region>,
    registry: &ColorRegistry,
) -> Result<Vec<(ProvinceId, Region)>> {
    let mut keyed = Vec::with_capacity(regions.len());
    for region in regions {
        let color_id = registry.id_of(region.color)?;
        keyed.push((color_id, region));
    }
    keyed.sort_by_key(|(color_id, r)| {
        (
            *color_id,
            r.centroid.1,
            r.centroid.0,
            r.first_pixel.1,
            r.first_pixel.0,
        )
    });
    Ok(keyed
        .into_iter()
        .enumerate()
        .map(|(i, (_, region))| (ProvinceId(i as u32 + 1), region))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MapError;
    use crate::extract::Bounds;

    fn region(color: Color, centroid: (u32, u32)) -> Region {
        Region {
            color,
            pixels: vec![centroid],
            pixel_count: 1,
            centroid,
            first_pixel: centroid,
            bounds: Bounds {
                min_x: centroid.0,
                min_y: centroid.1,
                max_x: centroid.0,
                max_y: centroid.1,
            },
        }
    }

    #[test]
    fn id_formatting() {
        assert_eq!(ProvinceId(7).to_string(), "province_0007");
        assert_eq!(ProvinceId(12345).to_string(), "province_12345");
        assert_eq!(serde_json::to_string(&ProvinceId(42)).unwrap(), "\"province_0042\"");
    }

    #[test]
    fn numbering_ignores_input_order() {
        let a = Color::new(10, 0, 0);
        let b = Color::new(20, 0, 0);
        let regions = vec![region(b, (1, 1)), region(a, (5, 9)), region(a, (9, 2))];
        let registry = ColorRegistry::from_colors([a, b]);
        let numbered = assign_ids(regions.clone(), &registry).unwrap();
        let mut reversed = regions;
        reversed.reverse();
        assert_eq!(numbered, assign_ids(reversed, &registry).unwrap());

        assert_eq!(numbered[0], (ProvinceId(1), region(a, (9, 2))));
        assert_eq!(numbered[1], (ProvinceId(2), region(a, (5, 9))));
        assert_eq!(numbered[2], (ProvinceId(3), region(b, (1, 1))));
    }

    #[test]
    fn unregistered_color_is_an_error() {
        let registry = ColorRegistry::from_colors([Color::new(1, 1, 1)]);
        let err = assign_ids(vec![region(Color::new(2, 2, 2), (0, 0))], &registry);
        assert!(matches!(err, Err(MapError::KeyNotFound(_))));
    }
}
