pub mod fetch;
pub mod raster;
pub mod table;
pub mod types;
pub mod vector;

pub use fetch::{LocalSource, resolve_location, resolve_source};
pub use raster::RasterInfo;
pub use table::Table;
pub use types::ReadError;
pub use vector::{VectorLayer, layer_fields, read_layer};
