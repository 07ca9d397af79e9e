pub mod modules;

pub use modules::{actor, config, directory, effect_client, presenter, protocol, session, suggest};
