pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod mix;
pub mod report;
pub mod runner;
pub mod stats;
pub mod worker;

pub use client::*;
pub use config::*;
pub use error::*;
pub use executor::*;
pub use mix::*;
pub use report::*;
pub use runner::*;
pub use stats::*;
