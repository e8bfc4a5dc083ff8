pub mod align;
pub mod compute;
pub mod consts;
pub mod error;
pub mod io;
pub mod mask;
pub mod pipeline;
pub mod raster;
pub mod tools;
