// src/export/png.rs
//! Визуализация владения провинциями
//!
//! Этот модуль преобразует разрешённые провинции в «политическую карту»:
//! - Каждый пиксель провинции закрашивается цветом её владельца
//! - Граница / нейтральная зона — белым, исключённые из карты — прозрачным
//! - Пиксели вне провинций (фон, отброшенные мелкие регионы) — чёрным
//!
//! ## Архитектура
//!
//! 1. **`OwnershipMap`** — карта пикселей:
//!    - Каждый пиксель хранит номер провинции (`ProvinceId.0`, 0 — нет провинции)
//!    - Цвета не хранятся — они берутся из списка `Province` при рендеринге
//!
//! 2. **Конвертация в изображение**:
//!    - Строится маппинг `province_id → RGBA` один раз перед обходом пикселей
//!    - Неизвестные ID получают чёрный цвет для обнаружения ошибок
//!
//! 3. **Кодирование в PNG** — в память, чтобы запись шла через общий
//!    механизм временных файлов экспортёра
//!
//! ## Пример использования
//! ```rust,ignore
//! let map = OwnershipMap::from_provinces(width, height, &resolution.provinces);
//! let bytes = map.encode_png(&resolution.provinces)?;
//! ```

use crate::error::Result;
use crate::owner::OwnerKind;
use crate::province::Province;
use image::{ImageBuffer, ImageOutputFormat, Rgba};
use std::collections::HashMap;
use std::io::Cursor;

/// Карта принадлежности пикселей провинциям
#[derive(Debug, Clone)]
pub struct OwnershipMap {
    /// Ширина карты в пикселях
    pub width: u32,

    /// Высота карты в пикселях
    pub height: u32,

    /// Данные карты: вектор номеров провинций размером `width × height`
    ///
    /// Индекс вычисляется как `y * width + x`; 0 — пиксель не принадлежит провинции.
    pub data: Vec<u32>,
}

impl OwnershipMap {
    /// Строит карту из пикселей провинций
    #[must_use]
    pub fn from_provinces(width: u32, height: u32, provinces: &[Province]) -> Self {
        let mut data = vec![0; (width as usize) * (height as usize)];
        for province in provinces {
            for &(x, y) in &province.region.pixels {
                let idx = (y as usize) * (width as usize) + (x as usize);
                if idx < data.len() {
                    data[idx] = province.id.0;
                }
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Преобразует карту в плоский RGBA-буфер `[R, G, B, A, R, G, B, A, ...]`
    ///
    /// # Особенности
    /// - Нации — цветом стартовой карты (цвет-подпись нации)
    /// - `Border` — белый, `Excluded` — полностью прозрачный
    /// - Пиксели без провинции — непрозрачный чёрный
    #[must_use]
    pub fn to_rgba_image(&self, provinces: &[Province]) -> Vec<u8> {
        let color_map: HashMap<u32, [u8; 4]> = provinces
            .iter()
            .map(|p| {
                let rgba = match p.owner.kind {
                    OwnerKind::Registered | OwnerKind::Fallback => p.owner_color.to_rgba(),
                    OwnerKind::Border => [255, 255, 255, 255],
                    OwnerKind::Excluded => [0, 0, 0, 0],
                };
                (p.id.0, rgba)
            })
            .collect();

        let default_color = [0, 0, 0, 255];

        self.data
            .iter()
            .flat_map(|&pid| color_map.get(&pid).copied().unwrap_or(default_color))
            .collect()
    }

    /// Кодирует карту в PNG в памяти
    pub fn encode_png(&self, provinces: &[Province]) -> Result<Vec<u8>> {
        let rgba = self.to_rgba_image(provinces);
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_raw(self.width, self.height, rgba).ok_or_else(|| {
                crate::error::MapError::InvalidConfig("ownership map buffer size mismatch".into())
            })?;
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
        Ok(bytes)
    }
}
