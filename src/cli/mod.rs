//! CLI commands for Laurel.
//!
//! Commands are organized into:
//! - **Progress commands**: read, quiz, sync (write to the active user's record)
//! - **Inspection commands**: status, defs
//! - **Session commands**: login, logout, whoami
//! - **Utility commands**: init

pub mod defs_cmd;
pub mod init;
pub mod login;
pub mod quiz;
pub mod read;
pub mod status;
pub mod sync;

pub use defs_cmd::DefsCommand;
pub use init::InitCommand;
pub use login::{active_user, LoginCommand};
pub use quiz::QuizCommand;
pub use read::ReadCommand;
pub use status::StatusCommand;
pub use sync::SyncCommand;
