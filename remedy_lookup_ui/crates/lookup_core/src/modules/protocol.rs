pub use remedy_protocol::*;
