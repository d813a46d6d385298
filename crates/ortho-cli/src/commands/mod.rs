pub mod config;
pub mod init;
pub mod pipeline;
pub mod quality;
