use std::path::PathBuf;
use thiserror::Error;

/// Ошибки, прерывающие запуск конвейера целиком.
///
/// Аномалии уровня пикселя/региона (неизвестный цвет владельца, мелкие регионы,
/// пустой результат) ошибками не считаются — они попадают в `RunReport`.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("{what} not found; searched: {}", display_paths(.searched))]
    MissingInput {
        what: &'static str,
        searched: Vec<PathBuf>,
    },

    #[error("mask is {mask_width}x{mask_height} but start-state is {start_width}x{start_height}")]
    DimensionMismatch {
        mask_width: u32,
        mask_height: u32,
        start_width: u32,
        start_height: u32,
    },

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load image: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, MapError>;
