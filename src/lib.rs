pub mod interface;
pub mod service;
pub mod shared;

pub use service::{ai, conversation, session, skills};
pub use shared::{config, entities, error, logging, ports, utils};
