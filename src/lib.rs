pub mod color;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod owner;
pub mod pipeline;
pub mod province;
pub mod raster;
pub mod registry;
pub mod synth;

pub use color::Color;
pub use config::{Connectivity, OutputFormat, PipelineConfig, SynthPolicy};
pub use error::{MapError, Result};
pub use extract::{Region, RegionExtractor};
pub use owner::{Owner, OwnerKind, OwnerResolver};
pub use pipeline::{RunReport, process, run};
pub use province::{Province, ProvinceId};
pub use raster::Raster;
pub use registry::{ColorRegistry, FactionRegistry};
pub use synth::MaskSynthesizer;
