// src/pipeline.rs
//! Полный прогон: входные файлы → провинции и владельцы → артефакты на диске
//!
//! Ошибки уровня файлов (нет входа, разные размеры растров) прерывают запуск
//! до записи чего-либо. Аномалии уровня регионов (неизвестный цвет владельца,
//! мелкие регионы, пустой результат) только логируются и попадают в `RunReport`.

use crate::config::{OceanStyle, PipelineConfig, SynthSettings};
use crate::error::{MapError, Result};
use crate::export::png::OwnershipMap;
use crate::export::{Artifact, Exporter, OWNERSHIP_PNG, Tables};
use crate::extract::RegionExtractor;
use crate::owner::{OwnerResolver, Resolution, check_dimensions};
use crate::province::assign_ids;
use crate::raster::Raster;
use crate::registry::FactionRegistry;
use crate::synth::MaskSynthesizer;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Имя синтезированной маски в каталоге вывода
pub const SYNTHETIC_MASK_PNG: &str = "synthetic_mask.png";

/// Итог одного запуска
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub width: u32,
    pub height: u32,
    /// Различных нефоновых цветов в маске
    pub distinct_colors: usize,
    pub provinces: usize,
    pub nations: usize,
    /// Регионы меньше `min_size`
    pub dropped_regions: usize,
    /// Цвета стартовой карты без записи в реестре
    pub unmapped_colors: usize,
    /// Неразобранные строки файла реестра наций
    pub skipped_registry_lines: usize,
    /// Маска была синтезирована, а не прочитана
    pub synthesized: bool,
    pub written: Vec<PathBuf>,
}

/// Результат обработки пары растров в памяти
#[derive(Debug, Clone)]
pub struct Outcome {
    pub resolution: Resolution,
    pub distinct_colors: usize,
    pub dropped_regions: usize,
}

/// Ищет вход сначала по указанному пути, затем в каждом каталоге поиска.
pub fn find_input(path: &Path, search_dirs: &[PathBuf], what: &'static str) -> Result<PathBuf> {
    let mut searched = vec![path.to_path_buf()];
    if path.is_relative() {
        searched.extend(search_dirs.iter().map(|dir| dir.join(path)));
    }
    match searched.iter().find(|candidate| candidate.is_file()) {
        Some(found) => Ok(found.clone()),
        None => Err(MapError::MissingInput { what, searched }),
    }
}

/// Выделение, нумерация и разрешение владельцев для уже загруженных растров.
pub fn process(
    mask: &Raster,
    start: &Raster,
    registry: &FactionRegistry,
    config: &PipelineConfig,
) -> Result<Outcome> {
    check_dimensions(mask, start)?;

    let extraction = RegionExtractor::new(&config.extract).extract(mask);
    let distinct_colors = extraction.colors.len();
    let dropped_regions = extraction.dropped;
    let numbered = assign_ids(extraction.regions, &extraction.colors)?;
    let resolution = OwnerResolver::new(start, registry, &config.owner)
        .resolve(numbered, config.extract.parallel);

    if resolution.provinces.is_empty() {
        warn!(
            "Не найдено ни одной провинции: маска {}×{}, нефоновых цветов {}, отброшено мелких {}",
            mask.width, mask.height, distinct_colors, dropped_regions
        );
    }

    Ok(Outcome {
        resolution,
        distinct_colors,
        dropped_regions,
    })
}

/// Запуск по конфигурации: поиск и загрузка входов, обработка, экспорт.
pub fn run(config: &PipelineConfig) -> Result<RunReport> {
    let input = &config.input;

    let start_path = find_input(&input.start, &input.search_dirs, "start-state raster")?;
    info!("Стартовая карта: {}", start_path.display());
    let start = Raster::load(&start_path)?;

    let (mask, synthesized) = match find_input(&input.mask, &input.search_dirs, "province mask") {
        Ok(path) => {
            info!("Маска провинций: {}", path.display());
            (Raster::load(&path)?, false)
        }
        Err(MapError::MissingInput { searched, .. }) if config.synth.when_missing => {
            warn!(
                "Маска не найдена ({} мест поиска), синтезируется {}×{}",
                searched.len(),
                start.width,
                start.height
            );
            // Океан синтезированной маски должен совпадать с фоном выделения,
            // иначе полосы градиента станут провинциями
            let settings = SynthSettings {
                ocean: OceanStyle::Background,
                ..config.synth.clone()
            };
            let synth = MaskSynthesizer::new(&settings, config.extract.background)
                .with_parallel(config.extract.parallel);
            (synth.synthesize_sized(start.width, start.height), true)
        }
        Err(e) => return Err(e),
    };

    let registry = match &input.registry {
        Some(path) => {
            let path = find_input(path, &input.search_dirs, "faction registry")?;
            FactionRegistry::load(&path)?
        }
        None => {
            info!("Реестр наций не задан: все владельцы получат имена-заглушки");
            FactionRegistry::default()
        }
    };

    let outcome = process(&mask, &start, &registry, config)?;
    let resolution = &outcome.resolution;

    let tables = Tables::from_resolution(resolution);
    let exporter = Exporter::new(&config.output);
    let mut artifacts = exporter.render(&tables)?;
    if config.output.ownership_map {
        let map = OwnershipMap::from_provinces(mask.width, mask.height, &resolution.provinces);
        artifacts.push(Artifact {
            name: OWNERSHIP_PNG,
            bytes: map.encode_png(&resolution.provinces)?,
        });
    }
    if synthesized {
        artifacts.push(Artifact {
            name: SYNTHETIC_MASK_PNG,
            bytes: mask.encode_png()?,
        });
    }
    let written = exporter.write(&artifacts)?;

    let report = RunReport {
        width: mask.width,
        height: mask.height,
        distinct_colors: outcome.distinct_colors,
        provinces: resolution.provinces.len(),
        nations: tables.nations.len(),
        dropped_regions: outcome.dropped_regions,
        unmapped_colors: resolution.unmapped.len(),
        skipped_registry_lines: registry.skipped_lines(),
        synthesized,
        written,
    };
    info!(
        "Готово: {} провинций, {} наций, отброшено мелких регионов {}, неизвестных цветов {}",
        report.provinces, report.nations, report.dropped_regions, report.unmapped_colors
    );
    if report.skipped_registry_lines > 0 {
        warn!(
            "В реестре наций пропущено неразобранных строк: {}",
            report.skipped_registry_lines
        );
    }
    Ok(report)
}
