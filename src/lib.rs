pub mod app;
pub mod auth;
pub mod canvas;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod store;

pub use app::App;
pub use db::Database;
