pub mod ffmpeg;
pub mod flight_log;
pub mod geotiff;
pub mod image_io;
pub mod ser;
pub mod video;
