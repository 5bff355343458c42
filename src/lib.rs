pub mod bootstrap;
pub mod config;
pub mod dims;
pub mod error;
pub mod facts;
pub mod history;
pub mod marts;
pub mod pipeline;
pub mod raw;
pub mod sheets;
pub mod table;

pub use config::Config;
pub use error::EtlError;
pub use pipeline::{rebuild_marts, run, run_logged, transform, Warehouse};
