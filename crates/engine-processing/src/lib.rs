pub mod error;
pub mod initializer;
pub mod injector;
pub mod message;
pub mod normalizer;
pub mod planner;
pub mod position;
pub mod probe;
pub mod snapshot;
pub mod state_manager;
pub mod streaming;
pub mod target;
