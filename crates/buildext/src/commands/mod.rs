pub mod build_ext;
pub mod config;
