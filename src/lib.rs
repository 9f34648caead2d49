pub mod error;
pub mod export;
pub mod geometry;
pub mod import;
pub mod lookup;
pub mod parameters;
pub mod parser;
pub mod projection;
pub mod raster;
pub mod scale;
pub mod workspace;

pub use error::{Error, Result};
