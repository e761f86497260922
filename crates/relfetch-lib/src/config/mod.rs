mod loader;
mod model;

pub use loader::{load_config, validate_config};
pub use model::{Config, DEFAULT_API_BASE_URL, DEFAULT_CHUNK_SIZE, DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS};
