// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub mod commands;

// Re-export commonly used handler functions for convenience
pub use handlers::{build_options, check_browser, exit_code, handle_harvest, init_logging};

// Re-export harvest functionality from hacklinks-core
pub use hacklinks_core::harvest::{Backend, HarvestOptions, Selection, execute_harvest};
