#![allow(clippy::len_without_is_empty, clippy::new_without_default)]

#[macro_use]
mod macros;
pub mod backend;
pub mod backends;
pub mod buffer_queue;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod frame;
pub mod input;
pub mod logger;
pub mod proxy;
pub mod rect;
pub mod root;
#[cfg(test)]
mod test_utils;
pub mod time;
pub mod utils;
pub mod vsync;
pub mod vsync_source;
pub mod wheel;
pub mod window_token;
