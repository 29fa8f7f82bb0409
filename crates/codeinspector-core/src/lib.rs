pub mod config_manager;
pub mod error;
pub mod language;
pub mod schema;
pub mod state;

pub use config_manager::*;
pub use error::*;
pub use language::detect_language;
pub use schema::*;
pub use state::*;
