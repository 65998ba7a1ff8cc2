// Library exports for photoshare
// This allows integration tests and the binary to share the same modules

pub mod activity;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod gallery;
pub mod routes;
pub mod state;
pub mod storage;
pub mod visibility;
