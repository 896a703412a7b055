//! Concrete adapter implementations for ports.

pub mod cache;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod fred_adapter;
pub mod gemini_adapter;
pub mod http;
pub mod page_fetch_adapter;
#[cfg(feature = "postgres")]
pub mod postgres_adapter;
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
#[cfg(feature = "web")]
pub mod web;
pub mod yahoo_adapter;
