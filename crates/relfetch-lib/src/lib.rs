pub mod batch;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod download;
pub mod error;
pub mod http;
pub mod progress;
pub mod release;
pub mod selector;
pub mod utils;
pub mod verification;

pub use config::Config;
pub use error::{FetchError, RelfetchError};
