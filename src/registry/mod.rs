pub mod color;
pub mod faction;

pub use color::{ColorRegistry, ColorRegistryBuilder};
pub use faction::FactionRegistry;
