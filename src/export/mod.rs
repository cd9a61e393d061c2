// src/export/mod.rs
//! Экспорт таблиц провинций и наций
//!
//! Все артефакты сначала целиком собираются в памяти, затем пишутся во
//! временные файлы и только после этого переименовываются на место. Если
//! запуск прерван, на диске не остаётся наполовину записанных таблиц.
//!
//! Сериализация детерминирована: провинции — по возрастанию id, нации — по
//! имени (затем по цвету). Повторный экспорт тех же таблиц даёт те же байты.

pub mod png;

use crate::color::Color;
use crate::config::OutputSettings;
use crate::error::Result;
use crate::extract::Bounds;
use crate::owner::{Faction, OwnerKind, Resolution};
use crate::province::ProvinceId;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

pub const PROVINCES_CSV: &str = "provinces.csv";
pub const NATIONS_CSV: &str = "nations.csv";
pub const OWNERSHIP_REPORT_CSV: &str = "ownership_report.csv";
pub const PROVINCE_DATA_JSON: &str = "province_data.json";
pub const COLOR_MAP_CSV: &str = "province_color_map.csv";
pub const UNMAPPED_CSV: &str = "unmapped_owners.csv";
pub const OWNERSHIP_PNG: &str = "ownership.png";

/// Строка таблицы провинций
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvinceRecord {
    pub id: ProvinceId,
    pub color: Color,
    pub owner: String,
    pub owner_kind: OwnerKind,
    pub owner_color: Color,
    pub pixel_count: usize,
    pub centroid: (u32, u32),
    pub bounds: Bounds,
}

/// Итоговые таблицы в порядке сериализации
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tables {
    pub provinces: Vec<ProvinceRecord>,
    pub nations: Vec<Faction>,
}

impl Tables {
    #[must_use]
    pub fn from_resolution(resolution: &Resolution) -> Self {
        let mut provinces: Vec<ProvinceRecord> = resolution
            .provinces
            .iter()
            .map(|p| ProvinceRecord {
                id: p.id,
                color: p.color(),
                owner: p.owner.name.clone(),
                owner_kind: p.owner.kind,
                owner_color: p.owner_color,
                pixel_count: p.pixel_count(),
                centroid: p.centroid(),
                bounds: p.region.bounds,
            })
            .collect();
        provinces.sort_by_key(|p| p.id);

        let mut nations = resolution.factions.clone();
        nations.sort();

        Self { provinces, nations }
    }

    /// Нация → число провинций, по алфавиту. Служебные метки тоже учитываются.
    #[must_use]
    pub fn ownership_report(&self) -> BTreeMap<&str, usize> {
        let mut report = BTreeMap::new();
        for p in &self.provinces {
            *report.entry(p.owner.as_str()).or_insert(0) += 1;
        }
        report
    }

    #[must_use]
    pub fn provinces_csv(&self) -> String {
        let mut out =
            String::from("province_id,r,g,b,owner,pixel_count,centroid_x,centroid_y\n");
        for p in &self.provinces {
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{},{}",
                p.id,
                p.color.r,
                p.color.g,
                p.color.b,
                csv_field(&p.owner),
                p.pixel_count,
                p.centroid.0,
                p.centroid.1
            );
        }
        out
    }

    #[must_use]
    pub fn nations_csv(&self) -> String {
        let mut out = String::from("name,r,g,b\n");
        for n in &self.nations {
            let _ = writeln!(
                out,
                "{},{},{},{}",
                csv_field(&n.name),
                n.color.r,
                n.color.g,
                n.color.b
            );
        }
        out
    }

    #[must_use]
    pub fn ownership_report_csv(&self) -> String {
        let mut out = String::from("owner,province_count\n");
        for (owner, count) in self.ownership_report() {
            let _ = writeln!(out, "{},{count}", csv_field(owner));
        }
        out
    }

    /// ARGB-ключи для JVM-клиента.
    #[must_use]
    pub fn color_map_csv(&self) -> String {
        let mut out = String::from("argb,argb_hex,province_id,owner\n");
        for p in &self.provinces {
            let argb = p.color.to_argb();
            let _ = writeln!(out, "{argb},0x{argb:08X},{},{}", p.id, csv_field(&p.owner));
        }
        out
    }

    /// Провинции, чей владелец не найден в реестре, с координатами для ручной проверки.
    #[must_use]
    pub fn unmapped_csv(&self) -> String {
        let mut out = String::from(
            "province_id,owner,owner_r,owner_g,owner_b,pixel_count,centroid_x,centroid_y,min_x,min_y,max_x,max_y\n",
        );
        for p in self
            .provinces
            .iter()
            .filter(|p| p.owner_kind == OwnerKind::Fallback)
        {
            let b = p.bounds;
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{},{},{},{},{},{}",
                p.id,
                csv_field(&p.owner),
                p.owner_color.r,
                p.owner_color.g,
                p.owner_color.b,
                p.pixel_count,
                p.centroid.0,
                p.centroid.1,
                b.min_x,
                b.min_y,
                b.max_x,
                b.max_y
            );
        }
        out
    }

    pub fn to_json(&self) -> Result<String> {
        let doc = JsonDocument {
            provinces: ProvincesById(&self.provinces),
            nations: &self.nations,
        };
        Ok(serde_json::to_string_pretty(&doc)? + "\n")
    }
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    provinces: ProvincesById<'a>,
    nations: &'a [Faction],
}

/// `{"province_0001": {...}, ...}` в порядке id, а не в порядке сортировки строк.
struct ProvincesById<'a>(&'a [ProvinceRecord]);

#[derive(Serialize)]
struct ProvinceJson<'a> {
    r: u8,
    g: u8,
    b: u8,
    owner: &'a str,
    pixel_count: usize,
    centroid: [u32; 2],
    owner_color: Color,
}

impl Serialize for ProvincesById<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for p in self.0 {
            map.serialize_entry(
                &p.id,
                &ProvinceJson {
                    r: p.color.r,
                    g: p.color.g,
                    b: p.color.b,
                    owner: &p.owner,
                    pixel_count: p.pixel_count,
                    centroid: [p.centroid.0, p.centroid.1],
                    owner_color: p.owner_color,
                },
            )?;
        }
        map.end()
    }
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Готовый к записи файл
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: &'static str,
    pub bytes: Vec<u8>,
}

pub struct Exporter<'a> {
    settings: &'a OutputSettings,
}

impl<'a> Exporter<'a> {
    #[must_use]
    pub fn new(settings: &'a OutputSettings) -> Self {
        Self { settings }
    }

    /// Собирает все табличные артефакты в памяти.
    pub fn render(&self, tables: &Tables) -> Result<Vec<Artifact>> {
        let s = self.settings;
        let mut artifacts = Vec::new();
        if s.format.csv() {
            artifacts.push(Artifact::text(PROVINCES_CSV, tables.provinces_csv()));
            artifacts.push(Artifact::text(NATIONS_CSV, tables.nations_csv()));
            artifacts.push(Artifact::text(
                OWNERSHIP_REPORT_CSV,
                tables.ownership_report_csv(),
            ));
        }
        if s.format.json() {
            artifacts.push(Artifact::text(PROVINCE_DATA_JSON, tables.to_json()?));
        }
        if s.color_map {
            artifacts.push(Artifact::text(COLOR_MAP_CSV, tables.color_map_csv()));
        }
        if s.unmapped_report {
            artifacts.push(Artifact::text(UNMAPPED_CSV, tables.unmapped_csv()));
        }
        Ok(artifacts)
    }

    /// Пишет артефакты в `output.dir`: сначала все во временные файлы, затем
    /// переименование. При ошибке временные файлы удаляются.
    pub fn write(&self, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
        let dir = &self.settings.dir;
        fs::create_dir_all(dir)?;

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let tmp = dir.join(format!(".{}.tmp", artifact.name));
            if let Err(e) = fs::write(&tmp, &artifact.bytes) {
                discard(&staged);
                let _ = fs::remove_file(&tmp);
                return Err(e.into());
            }
            staged.push((tmp, dir.join(artifact.name)));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (i, (tmp, target)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(tmp, target) {
                discard(&staged[i..]);
                return Err(e.into());
            }
            debug!("Записан {}", target.display());
            written.push(target.clone());
        }
        info!("Экспортировано файлов: {} в {}", written.len(), dir.display());
        Ok(written)
    }
}

impl Artifact {
    #[must_use]
    pub fn text(name: &'static str, body: String) -> Self {
        Self {
            name,
            bytes: body.into_bytes(),
        }
    }
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (tmp, _) in staged {
        let _ = fs::remove_file(tmp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u32, color: Color, owner: &str, kind: OwnerKind) -> ProvinceRecord {
        ProvinceRecord {
            id: ProvinceId(id),
            color,
            owner: owner.to_string(),
            owner_kind: kind,
            owner_color: Color::new(17, 17, 17),
            pixel_count: 100,
            centroid: (4, 5),
            bounds: Bounds {
                min_x: 0,
                min_y: 0,
                max_x: 9,
                max_y: 9,
            },
        }
    }

    fn sample_tables() -> Tables {
        Tables {
            provinces: vec![
                record(1, Color::new(0, 0, 255), "Roma", OwnerKind::Registered),
                record(2, Color::new(255, 0, 0), "Unknown_17_17_17", OwnerKind::Fallback),
                record(3, Color::new(255, 0, 0), "Roma", OwnerKind::Registered),
            ],
            nations: vec![
                Faction {
                    name: "Roma".into(),
                    color: Color::new(220, 40, 40),
                },
                Faction {
                    name: "Unknown_17_17_17".into(),
                    color: Color::new(17, 17, 17),
                },
            ],
        }
    }

    #[test]
    fn provinces_csv_layout() {
        let csv = sample_tables().provinces_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "province_id,r,g,b,owner,pixel_count,centroid_x,centroid_y"
        );
        assert_eq!(lines[1], "province_0001,0,0,255,Roma,100,4,5");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn ownership_report_is_alphabetical() {
        let tables = sample_tables();
        let report: Vec<(&str, usize)> = tables.ownership_report().into_iter().collect();
        assert_eq!(report, vec![("Roma", 2), ("Unknown_17_17_17", 1)]);
        assert_eq!(
            tables.ownership_report_csv(),
            "owner,province_count\nRoma,2\nUnknown_17_17_17,1\n"
        );
    }

    #[test]
    fn json_keeps_id_order_and_schema() {
        let json = sample_tables().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["provinces"]["province_0002"]["owner"], "Unknown_17_17_17");
        assert_eq!(value["provinces"]["province_0001"]["b"], 255);
        assert_eq!(value["nations"][0]["color"], serde_json::json!([220, 40, 40]));
        let first = json.find("province_0001").unwrap();
        let third = json.find("province_0003").unwrap();
        assert!(first < third);
    }

    #[test]
    fn rendering_twice_is_byte_identical() {
        let tables = sample_tables();
        let settings = OutputSettings::default();
        let exporter = Exporter::new(&settings);
        assert_eq!(exporter.render(&tables).unwrap(), exporter.render(&tables).unwrap());
    }

    #[test]
    fn csv_quotes_awkward_names() {
        assert_eq!(csv_field("Roma"), "Roma");
        assert_eq!(csv_field("Egypt, Upper"), "\"Egypt, Upper\"");
        assert_eq!(csv_field("the \"Great\""), "\"the \"\"Great\"\"\"");
    }

    #[test]
    fn color_map_uses_argb() {
        let csv = sample_tables().color_map_csv();
        assert!(csv.lines().nth(1).unwrap().starts_with("4278190335,0xFF0000FF,province_0001"));
    }

    #[test]
    fn unmapped_report_lists_only_fallbacks() {
        let csv = sample_tables().unmapped_csv();
        let rows: Vec<&str> = csv.lines().skip(1).collect();
        assert_eq!(rows, vec!["province_0002,Unknown_17_17_17,17,17,17,100,4,5,0,0,9,9"]);
    }

    #[test]
    fn write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = OutputSettings {
            dir: dir.path().join("out"),
            ..OutputSettings::default()
        };
        let exporter = Exporter::new(&settings);
        let artifacts = exporter.render(&sample_tables()).unwrap();
        let written = exporter.write(&artifacts).unwrap();
        assert_eq!(written.len(), artifacts.len());
        let names: Vec<String> = fs::read_dir(&settings.dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|n| !n.ends_with(".tmp")));
        assert!(names.contains(&PROVINCES_CSV.to_string()));
    }

    #[test]
    fn failed_rename_cleans_up_remaining_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = OutputSettings {
            dir: dir.path().to_path_buf(),
            ..OutputSettings::default()
        };
        // Каталог на месте nations.csv: переименование поверх него не удаётся
        fs::create_dir_all(dir.path().join(NATIONS_CSV).join("keep")).unwrap();

        let exporter = Exporter::new(&settings);
        let artifacts = exporter.render(&sample_tables()).unwrap();
        assert!(exporter.write(&artifacts).is_err());

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|n| !n.ends_with(".tmp")), "{names:?}");
        // Файлы до сбоя уже на месте, после него не появились
        assert!(names.contains(&PROVINCES_CSV.to_string()));
        assert!(!names.contains(&OWNERSHIP_REPORT_CSV.to_string()));
    }
}
