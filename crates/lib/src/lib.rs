//! mail2git core library — subject-to-path resolution, sender allow-list, body rendering,
//! the GitHub contents client, and the webhook gateway used by the CLI.

pub mod commit;
pub mod config;
pub mod error;
pub mod gateway;
pub mod init;
pub mod message;
pub mod path;
pub mod render;
pub mod sender;
pub mod store;
