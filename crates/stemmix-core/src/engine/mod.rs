//! Real-time render path
//!
//! The audio thread owns an [`AudioEngine`] outright. The control thread
//! talks to it through [`EngineCommand`]s on a lock-free queue and reads back
//! through [`EngineAtomics`]; neither side ever waits on the other.

mod command;
#[allow(clippy::module_inception)]
mod engine;
pub mod gc;
mod mixer;

pub use command::{command_channel, CommandSender, EngineCommand, COMMAND_QUEUE_CAPACITY};
pub use engine::{AudioEngine, EngineAtomics, EngineStem};
pub use mixer::MasterBus;
