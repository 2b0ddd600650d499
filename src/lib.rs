pub mod cli;
pub mod updater;

#[cfg(feature = "http")]
pub mod server;
