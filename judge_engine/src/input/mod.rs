pub mod autoplay;
pub mod events;

use self::events::GameInput;
use crate::engine::Engine;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Inputs travelling from input threads to the thread that owns an engine.
///
/// Any number of producers hold a [`Sender`]; the engine side drains the
/// channel once per frame with [`InputQueue::feed`].
pub struct InputQueue {
    sender: Sender<GameInput>,
    receiver: Receiver<GameInput>,
}

impl InputQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn push(&self, input: GameInput) {
        if let Err(err) = self.sender.send(input) {
            log::warn!("dropped input {} at {}: {err}", input.action, input.time);
        }
    }

    /// Sender handle for a producer thread.
    pub fn sender(&self) -> Sender<GameInput> {
        self.sender.clone()
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Everything received so far, ordered by input time.
    ///
    /// Producers race each other, so arrival order is not time order. Inputs
    /// with equal times keep their arrival order.
    pub fn drain(&self) -> Vec<GameInput> {
        let mut inputs: Vec<GameInput> = self.receiver.try_iter().collect();
        inputs.sort_by(|a, b| a.time.total_cmp(&b.time));
        inputs
    }

    /// Moves everything received into `engine`'s input queue. Returns how many inputs moved.
    pub fn feed<E: Engine>(&self, engine: &mut E) -> usize {
        let inputs = self.drain();
        for &input in &inputs {
            engine.queue_input(input);
        }
        inputs.len()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}
