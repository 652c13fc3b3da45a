pub mod app;
pub mod cli;
pub mod config;
pub mod crawler;
pub mod error;
pub mod exif_tags;
pub mod folder_picker;
pub mod formats;
pub mod icc;
pub mod inspect;
pub mod pixel_mode;
pub mod report;
pub mod theme;
pub mod thumbnail;
pub mod tree;
pub mod utils;
pub mod watcher;
pub mod worker;

pub const QUALIFIER: &str = "com";
pub const ORGANIZATION: &str = "metadata-reader";
pub const APPLICATION: &str = "metadata-reader";
pub const VALID_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "tiff", "bmp", "pcx"];

pub const WORKER_MESSAGE_MEMORY_KEY: &str = "worker-message";
