pub mod clock;
pub mod config;
pub mod economy;
pub mod engine;
pub mod integrity;
pub mod moderation;
pub mod protocol;
pub mod room;
pub mod runtime;
pub mod server;
pub mod session;
pub mod sync;
pub mod tokio_tools;

#[cfg(test)]
pub mod test_utils;
