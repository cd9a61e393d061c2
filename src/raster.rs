// src/raster.rs
use crate::color::Color;
use crate::error::Result;
use image::imageops::{self, FilterType};
use image::{ImageOutputFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Двумерная сетка цветов фиксированного размера.
///
/// Альфа-канал хранится отдельно: для 3-канальных изображений он целиком равен 255.
/// Пиксель с альфой ниже 255 означает «исключён из карты».
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub data: Vec<Color>,
    pub alpha: Vec<u8>,
}

impl Raster {
    /// Непрозрачный растр, залитый одним цветом.
    #[must_use]
    pub fn new(width: u32, height: u32, fill: Color) -> Self {
        let len = (width as usize) * (height as usize);
        Self {
            width,
            height,
            data: vec![fill; len],
            alpha: vec![255; len],
        }
    }

    #[must_use]
    pub fn from_rgba_image(img: &RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        let len = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(len);
        let mut alpha = Vec::with_capacity(len);
        for &Rgba([r, g, b, a]) in img.pixels() {
            data.push(Color::new(r, g, b));
            alpha.push(a);
        }
        Self {
            width,
            height,
            data,
            alpha,
        }
    }

    /// Загружает изображение с диска (3 или 4 канала — любые форматы `image`).
    pub fn load(path: &Path) -> Result<Self> {
        let img = image::open(path)?.to_rgba8();
        Ok(Self::from_rgba_image(&img))
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.data[self.index(x, y)]
    }

    #[must_use]
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.alpha[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let idx = self.index(x, y);
        self.data[idx] = color;
        self.alpha[idx] = 255;
    }

    /// Заливает круг радиуса `radius` с центром `(cx, cy)`; строгое `dx² + dy² < r²`.
    ///
    /// Части круга за пределами растра отбрасываются.
    pub fn paint_disc(&mut self, cx: i64, cy: i64, radius: i64, color: Color) {
        if radius <= 0 {
            return;
        }
        let (w, h) = (i64::from(self.width), i64::from(self.height));
        let r2 = radius * radius;
        for y in (cy - radius).max(0)..(cy + radius).min(h) {
            for x in (cx - radius).max(0)..(cx + radius).min(w) {
                let (dx, dy) = (x - cx, y - cy);
                if dx * dx + dy * dy < r2 {
                    self.set(x as u32, y as u32, color);
                }
            }
        }
    }

    #[must_use]
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let idx = self.index(x, y);
            let c = self.data[idx];
            Rgba([c.r, c.g, c.b, self.alpha[idx]])
        })
    }

    pub fn save_as_png(&self, path: &Path) -> Result<()> {
        self.to_rgba_image().save(path)?;
        Ok(())
    }

    /// PNG в памяти: для записи через временные файлы экспортёра.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.to_rgba_image()
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
        Ok(bytes)
    }

    /// Сохраняет уменьшенную копию шириной `width` (пропорции сохраняются).
    pub fn save_preview(&self, path: &Path, width: u32) -> Result<()> {
        let width = width.clamp(1, self.width.max(1));
        let height = ((u64::from(self.height) * u64::from(width)) / u64::from(self.width.max(1)))
            .max(1) as u32;
        // Nearest — чтобы не появлялись промежуточные цвета на границах
        let preview = imageops::resize(&self.to_rgba_image(), width, height, FilterType::Nearest);
        preview.save(path)?;
        Ok(())
    }
}
