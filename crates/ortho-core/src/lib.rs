pub mod consts;
pub mod error;
pub mod frame;
pub mod georef;
pub mod io;
pub mod pipeline;
pub mod quality;
pub mod select;
pub mod stitch;
