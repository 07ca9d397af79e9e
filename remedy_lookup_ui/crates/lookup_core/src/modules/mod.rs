pub mod actor;
pub mod config;
pub mod directory;
pub mod effect_client;
pub mod presenter;
pub mod protocol;
pub mod session;
pub mod suggest;
