// src/config.rs
//! Конфигурация конвейера извлечения провинций
//!
//! Этот модуль определяет все параметры запуска:
//! - Пути к входным файлам и каталоги поиска
//! - Параметры выделения регионов (фон, минимальный размер, связность)
//! - Метки владельцев-заглушек
//! - Параметры синтеза маски, если авторской маски нет
//! - Набор выходных артефактов
//!
//! Все структуры читаются из TOML; каждое поле имеет значение по умолчанию.

use crate::color::Color;
use crate::error::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Связность при выделении компонент.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Connectivity {
    /// Только соседи по сторонам
    Four,
    /// Стороны и диагонали: касание углами — тоже один регион
    #[default]
    Eight,
}

/// Способ синтеза маски.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SynthPolicy {
    /// Круги вокруг семян; при наложении побеждает последний нарисованный
    RadiusFill,
    /// Дискретная диаграмма Вороного с ограничением радиусом семени
    #[default]
    NearestSeed,
}

/// Чем заполняется всё, что не попало ни в одну провинцию.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OceanStyle {
    /// Вертикальный сине-зелёный градиент (визуально отличим от провинций)
    #[default]
    Gradient,
    /// Цвет фона из `[extract]` — такие пиксели не станут провинциями
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputFormat {
    Csv,
    Json,
    #[default]
    Both,
}

impl OutputFormat {
    #[must_use]
    pub fn csv(self) -> bool {
        matches!(self, OutputFormat::Csv | OutputFormat::Both)
    }

    #[must_use]
    pub fn json(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }
}

/// Входные файлы
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSettings {
    /// Маска провинций
    #[serde(default = "default_mask")]
    pub mask: PathBuf,

    /// Стартовая карта владения
    #[serde(default = "default_start")]
    pub start: PathBuf,

    /// Реестр наций; без него все владельцы получают имена-заглушки
    #[serde(default)]
    pub registry: Option<PathBuf>,

    /// Каталоги, в которых ищутся относительные пути (по порядку, после самого пути)
    #[serde(default = "default_search_dirs")]
    pub search_dirs: Vec<PathBuf>,
}

fn default_mask() -> PathBuf {
    PathBuf::from("province_mask.png")
}
fn default_start() -> PathBuf {
    PathBuf::from("start.png")
}
fn default_search_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("resources"), PathBuf::from("resources/img")]
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            mask: default_mask(),
            start: default_start(),
            registry: None,
            search_dirs: default_search_dirs(),
        }
    }
}

/// Параметры выделения регионов
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractSettings {
    /// Цвет фона маски, никогда не становится провинцией
    #[serde(default = "default_background")]
    pub background: Color,

    /// Компоненты меньше этого числа пикселей отбрасываются
    #[serde(default = "default_min_size")]
    pub min_size: usize,

    #[serde(default)]
    pub connectivity: Connectivity,

    /// Высота полосы строк при разбиении на куски
    #[serde(default = "default_band_rows")]
    pub band_rows: u32,

    /// Обрабатывать полосы параллельно (нужна фича `parallel`)
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_background() -> Color {
    Color::BLACK
}
fn default_min_size() -> usize {
    20
}
fn default_band_rows() -> u32 {
    256
}
fn default_parallel() -> bool {
    true
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            background: default_background(),
            min_size: default_min_size(),
            connectivity: Connectivity::default(),
            band_rows: default_band_rows(),
            parallel: default_parallel(),
        }
    }
}

/// Метки владельцев, не являющихся нациями
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnerSettings {
    /// Префикс имени для цветов, отсутствующих в реестре: `Unknown_17_17_17`
    #[serde(default = "default_fallback_prefix")]
    pub fallback_prefix: String,

    /// Непрозрачный белый пиксель стартовой карты — граница/нейтральная зона
    #[serde(default = "default_border_label")]
    pub border_label: String,

    /// Прозрачный пиксель стартовой карты — провинция исключена из карты
    #[serde(default = "default_excluded_label")]
    pub excluded_label: String,
}

fn default_fallback_prefix() -> String {
    "Unknown".to_string()
}
fn default_border_label() -> String {
    "BORDER".to_string()
}
fn default_excluded_label() -> String {
    "REMOVE_FROM_MAP".to_string()
}

impl Default for OwnerSettings {
    fn default() -> Self {
        Self {
            fallback_prefix: default_fallback_prefix(),
            border_label: default_border_label(),
            excluded_label: default_excluded_label(),
        }
    }
}

/// Параметры синтеза маски
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynthSettings {
    /// Синтезировать маску, если авторская не найдена (по умолчанию выключено:
    /// опечатка в пути к маске должна останавливать запуск)
    #[serde(default)]
    pub when_missing: bool,

    #[serde(default)]
    pub policy: SynthPolicy,

    /// Сид генератора случайных чисел (детерминированный синтез)
    #[serde(default)]
    pub seed: u64,

    /// Размер холста для автономного синтеза (в конвейере берётся размер стартовой карты)
    #[serde(default = "default_synth_width")]
    pub width: u32,
    #[serde(default = "default_synth_height")]
    pub height: u32,

    #[serde(default = "default_num_seeds")]
    pub num_seeds: usize,

    /// Отступ семян от краёв холста
    #[serde(default = "default_margin")]
    pub margin: u32,

    #[serde(default = "default_radius_min")]
    pub radius_min: u32,
    #[serde(default = "default_radius_max")]
    pub radius_max: u32,

    /// Нижняя граница каждого канала случайного цвета (яркие цвета не путаются с океаном)
    #[serde(default = "default_color_floor")]
    pub color_floor: u8,

    #[serde(default = "default_islands")]
    pub islands: usize,
    #[serde(default = "default_island_radius_min")]
    pub island_radius_min: u32,
    #[serde(default = "default_island_radius_max")]
    pub island_radius_max: u32,

    #[serde(default = "default_peninsulas")]
    pub peninsulas: usize,
    #[serde(default = "default_peninsula_length_min")]
    pub peninsula_length_min: u32,
    #[serde(default = "default_peninsula_length_max")]
    pub peninsula_length_max: u32,
    /// Полуширина у основания полуострова; сужается на 1 каждые 10 шагов
    #[serde(default = "default_peninsula_half_width")]
    pub peninsula_half_width: u32,
    /// Минимальная полуширина у оконечности
    #[serde(default = "default_peninsula_min_half_width")]
    pub peninsula_min_half_width: u32,

    #[serde(default)]
    pub ocean: OceanStyle,

    /// Шумовое искажение береговой линии (0.0 = ровные круги).
    /// Эффективный радиус семени: `radius · (1 + coast_jitter · noise)`.
    #[serde(default)]
    pub coast_jitter: f32,
}

fn default_synth_width() -> u32 {
    2048
}
fn default_synth_height() -> u32 {
    1024
}
fn default_num_seeds() -> usize {
    200
}
fn default_margin() -> u32 {
    100
}
fn default_radius_min() -> u32 {
    40
}
fn default_radius_max() -> u32 {
    150
}
fn default_color_floor() -> u8 {
    80
}
fn default_islands() -> usize {
    30
}
fn default_island_radius_min() -> u32 {
    15
}
fn default_island_radius_max() -> u32 {
    60
}
fn default_peninsulas() -> usize {
    20
}
fn default_peninsula_length_min() -> u32 {
    50
}
fn default_peninsula_length_max() -> u32 {
    150
}
fn default_peninsula_half_width() -> u32 {
    20
}
fn default_peninsula_min_half_width() -> u32 {
    5
}

impl Default for SynthSettings {
    fn default() -> Self {
        Self {
            when_missing: false,
            policy: SynthPolicy::default(),
            seed: 0,
            width: default_synth_width(),
            height: default_synth_height(),
            num_seeds: default_num_seeds(),
            margin: default_margin(),
            radius_min: default_radius_min(),
            radius_max: default_radius_max(),
            color_floor: default_color_floor(),
            islands: default_islands(),
            island_radius_min: default_island_radius_min(),
            island_radius_max: default_island_radius_max(),
            peninsulas: default_peninsulas(),
            peninsula_length_min: default_peninsula_length_min(),
            peninsula_length_max: default_peninsula_length_max(),
            peninsula_half_width: default_peninsula_half_width(),
            peninsula_min_half_width: default_peninsula_min_half_width(),
            ocean: OceanStyle::default(),
            coast_jitter: 0.0,
        }
    }
}

/// Выходные артефакты
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputSettings {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    #[serde(default)]
    pub format: OutputFormat,

    /// `ownership.png`: провинции, закрашенные цветом владельца
    #[serde(default)]
    pub ownership_map: bool,

    /// `province_color_map.csv` с ARGB-ключами для JVM-клиента
    #[serde(default = "default_true")]
    pub color_map: bool,

    /// `unmapped_owners.csv`: провинции с владельцем-заглушкой
    #[serde(default = "default_true")]
    pub unmapped_report: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}
fn default_true() -> bool {
    true
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            format: OutputFormat::default(),
            ownership_map: false,
            color_map: true,
            unmapped_report: true,
        }
    }
}

/// Полная конфигурация одного запуска
///
/// # Пример
/// ```toml
/// # provinces.toml
/// [input]
/// mask = "province_mask.png"
/// start = "start.png"
/// registry = "nation.txt"
///
/// [extract]
/// min_size = 20
/// connectivity = "Eight"
///
/// [output]
/// dir = "resources/data"
/// format = "Both"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub input: InputSettings,
    #[serde(default)]
    pub extract: ExtractSettings,
    #[serde(default)]
    pub owner: OwnerSettings,
    #[serde(default)]
    pub synth: SynthSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

impl PipelineConfig {
    /// Загружает параметры из TOML-файла и проверяет их.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.extract.band_rows == 0 {
            return Err(MapError::InvalidConfig("extract.band_rows must be > 0".into()));
        }
        let s = &self.synth;
        if s.radius_min > s.radius_max
            || s.island_radius_min > s.island_radius_max
            || s.peninsula_length_min > s.peninsula_length_max
        {
            return Err(MapError::InvalidConfig(
                "synth ranges must satisfy min <= max".into(),
            ));
        }
        if s.width == 0 || s.height == 0 {
            return Err(MapError::InvalidConfig("synth canvas must be non-empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(config.extract, ExtractSettings::default());
        assert_eq!(config.extract.connectivity, Connectivity::Eight);
        assert_eq!(config.extract.background, Color::BLACK);
        assert_eq!(config.owner.fallback_prefix, "Unknown");
        assert!(config.input.registry.is_none());
        assert!(!config.synth.when_missing);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [input]
            registry = "nation.txt"

            [extract]
            background = [10, 20, 30]
            connectivity = "Four"
            min_size = 1

            [synth]
            policy = "RadiusFill"
            ocean = "Background"
            "#,
        )
        .unwrap();
        assert_eq!(config.input.registry, Some(PathBuf::from("nation.txt")));
        assert_eq!(config.input.mask, PathBuf::from("province_mask.png"));
        assert_eq!(config.extract.background, Color::new(10, 20, 30));
        assert_eq!(config.extract.connectivity, Connectivity::Four);
        assert_eq!(config.extract.band_rows, 256);
        assert_eq!(config.synth.policy, SynthPolicy::RadiusFill);
        assert_eq!(config.synth.ocean, OceanStyle::Background);
        assert_eq!(config.synth.num_seeds, 200);
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let mut config = PipelineConfig::default();
        config.synth.radius_min = 10;
        config.synth.radius_max = 5;
        assert!(matches!(config.validate(), Err(MapError::InvalidConfig(_))));
    }
}
