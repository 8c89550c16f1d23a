//! Lock-free command queue from the control thread to the audio thread
//!
//! The control thread never touches engine state directly. Each session
//! operation turns into one or more [`EngineCommand`]s pushed onto an `rtrb`
//! single-producer single-consumer ring; the audio thread drains the ring at
//! the start of every processing quantum.
//!
//! # Why Lock-Free?
//!
//! A mutex shared with the device callback means the callback can lose a
//! `try_lock()` while the control thread is busy, and a lost lock is a
//! dropped buffer. With the ring:
//! - push and pop are wait-free and never allocate
//! - every command pushed during one control-path turn is drained in the
//!   same quantum, so "start all stems" lands on a single buffer boundary
//!
//! # Usage
//!
//! ```ignore
//! let (mut tx, mut rx) = command_channel(COMMAND_QUEUE_CAPACITY);
//!
//! // control thread
//! tx.send(EngineCommand::Start { offset_seconds: 0.0 });
//!
//! // audio thread
//! engine.process_commands(&mut rx);
//! ```

use std::collections::VecDeque;

use basedrop::Owned;

use super::engine::EngineStem;
use crate::effect::StageUpdate;
use crate::types::StemId;

/// Default ring size; one session operation sends at most a handful
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Commands sent from the control thread to the audio thread
///
/// Each variant is applied atomically between two render quanta.
pub enum EngineCommand {
    // ─────────────────────────────────────────────────────────────
    // Stem Set
    // ─────────────────────────────────────────────────────────────
    /// Replace the whole stem set
    ///
    /// Wrapped in `Owned` so the previous set, which the engine drops when
    /// swapping, is freed by the collector instead of the audio thread.
    LoadStems(Owned<Vec<EngineStem>>),
    /// Drop every stem
    ClearStems,

    // ─────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────
    /// Start every stem's source at `min(offset, stem duration)`
    Start { offset_seconds: f64 },
    /// Stop every active source
    Stop,

    // ─────────────────────────────────────────────────────────────
    // Chain And Mix
    // ─────────────────────────────────────────────────────────────
    /// Change one stage of one stem's chain
    UpdateStage { stem: StemId, update: StageUpdate },
    SetMasterVolume(f32),
}

impl EngineCommand {
    /// Short label for logging
    pub fn label(&self) -> &'static str {
        match self {
            EngineCommand::LoadStems(_) => "LoadStems",
            EngineCommand::ClearStems => "ClearStems",
            EngineCommand::Start { .. } => "Start",
            EngineCommand::Stop => "Stop",
            EngineCommand::UpdateStage { .. } => "UpdateStage",
            EngineCommand::SetMasterVolume(_) => "SetMasterVolume",
        }
    }
}

/// Create a command queue pair
pub fn command_channel(capacity: usize) -> (CommandSender, rtrb::Consumer<EngineCommand>) {
    let (producer, consumer) = rtrb::RingBuffer::new(capacity.max(1));
    (
        CommandSender {
            producer,
            backlog: VecDeque::new(),
        },
        consumer,
    )
}

/// Sending half of the command queue
///
/// `send` never blocks and never drops a command. If the ring is full the
/// command waits in a local backlog, which is flushed in order before
/// anything newer is pushed, so the audio thread always sees commands in the
/// order they were issued.
pub struct CommandSender {
    producer: rtrb::Producer<EngineCommand>,
    backlog: VecDeque<EngineCommand>,
}

impl CommandSender {
    /// Queue a command for the audio thread
    pub fn send(&mut self, cmd: EngineCommand) {
        self.flush();
        if !self.backlog.is_empty() {
            self.backlog.push_back(cmd);
            return;
        }
        if let Err(rtrb::PushError::Full(cmd)) = self.producer.push(cmd) {
            log::warn!(
                "Engine command queue full, holding {} until the audio thread catches up",
                cmd.label()
            );
            self.backlog.push_back(cmd);
        }
    }

    /// Move as much of the backlog into the ring as fits
    ///
    /// Returns the number of commands still waiting.
    pub fn flush(&mut self) -> usize {
        while let Some(cmd) = self.backlog.pop_front() {
            if let Err(rtrb::PushError::Full(cmd)) = self.producer.push(cmd) {
                self.backlog.push_front(cmd);
                break;
            }
        }
        self.backlog.len()
    }

    /// Commands held locally because the ring was full
    pub fn pending(&self) -> usize {
        self.backlog.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(offset: f64) -> EngineCommand {
        EngineCommand::Start {
            offset_seconds: offset,
        }
    }

    #[test]
    fn test_send_and_receive() {
        let (mut tx, mut rx) = command_channel(4);
        tx.send(EngineCommand::Stop);
        tx.send(start(1.5));

        assert!(matches!(rx.pop(), Ok(EngineCommand::Stop)));
        assert!(matches!(
            rx.pop(),
            Ok(EngineCommand::Start { offset_seconds }) if offset_seconds == 1.5
        ));
        assert!(rx.pop().is_err());
    }

    #[test]
    fn test_full_queue_keeps_order() {
        let (mut tx, mut rx) = command_channel(2);
        for i in 0..5 {
            tx.send(start(i as f64));
        }
        assert_eq!(tx.pending(), 3);

        let mut seen = Vec::new();
        while seen.len() < 5 {
            while let Ok(cmd) = rx.pop() {
                if let EngineCommand::Start { offset_seconds } = cmd {
                    seen.push(offset_seconds);
                }
            }
            tx.flush();
        }

        assert_eq!(seen, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(tx.pending(), 0);
    }
}
