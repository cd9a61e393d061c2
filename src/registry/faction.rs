// src/registry/faction.rs
//! Реестр наций: цвет на стартовой карте → имя
//!
//! Поддерживаемые строки файла:
//! - `Name,R,G,B` — имя может содержать запятые, числа берутся справа;
//! - `Nation(R, G, B, Name);` — формат `nation.txt`;
//! - пустые строки и комментарии (`#`, `//`) пропускаются.
//!
//! Некорректная строка пропускается и учитывается в `skipped_lines`, но не
//! прерывает загрузку. При повторе цвета побеждает первая запись.

use crate::color::Color;
use crate::error::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactionRegistry {
    names: BTreeMap<Color, String>,
    skipped_lines: usize,
}

impl FactionRegistry {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let registry = Self::parse(&text);
        debug!(
            "Реестр наций {}: {} записей, пропущено строк: {}",
            path.display(),
            registry.len(),
            registry.skipped_lines
        );
        Ok(registry)
    }

    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut registry = Self::default();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            match parse_line(line) {
                Some((color, name)) => {
                    if !registry.insert(color, name) {
                        debug!("Строка {}: цвет {color} уже занят, запись проигнорирована", lineno + 1);
                    }
                }
                None => {
                    warn!("Строка {} реестра наций не разобрана: {line:?}", lineno + 1);
                    registry.skipped_lines += 1;
                }
            }
        }
        registry
    }

    /// Добавляет запись; возвращает `false`, если цвет уже был зарегистрирован.
    pub fn insert(&mut self, color: Color, name: String) -> bool {
        if self.names.contains_key(&color) {
            return false;
        }
        self.names.insert(color, name);
        true
    }

    #[must_use]
    pub fn name_of(&self, color: Color) -> Option<&str> {
        self.names.get(&color).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }
}

fn parse_line(line: &str) -> Option<(Color, String)> {
    if let Some(body) = line
        .strip_prefix("Nation(")
        .and_then(|rest| rest.strip_suffix(");").or_else(|| rest.strip_suffix(')')))
    {
        let mut parts = body.splitn(4, ',').map(str::trim);
        let r = parts.next()?.parse().ok()?;
        let g = parts.next()?.parse().ok()?;
        let b = parts.next()?.parse().ok()?;
        let name = clean_name(parts.next()?)?;
        return Some((Color::new(r, g, b), name));
    }

    // Name,R,G,B — разбираем справа налево
    let mut parts = line.rsplitn(4, ',').map(str::trim);
    let b = parts.next()?.parse().ok()?;
    let g = parts.next()?.parse().ok()?;
    let r = parts.next()?.parse().ok()?;
    let name = clean_name(parts.next()?)?;
    Some((Color::new(r, g, b), name))
}

fn clean_name(raw: &str) -> Option<String> {
    let name = raw.trim().trim_matches('"').trim();
    (!name.is_empty()).then(|| name.to_string())
}
