pub mod admin;
pub mod assistant;
pub mod config;
pub mod conversation;
pub mod import;
pub mod prompt;
pub mod sidebar;
pub mod store;
pub mod voice;

pub use admin::*;
pub use assistant::*;
pub use config::*;
pub use conversation::*;
pub use import::*;
pub use prompt::*;
pub use sidebar::*;
pub use store::*;
pub use voice::*;
