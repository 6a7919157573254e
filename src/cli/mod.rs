mod commands;
mod handlers;

pub use commands::{Cli, Commands};
pub use handlers::{
    handle_create, handle_delete, handle_get, handle_health, handle_list, handle_recent,
    handle_search, handle_stats, handle_tags, handle_update, handle_validate,
};
