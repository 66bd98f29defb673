//! Draw/discard card piles.
//!
//! Both the treasure deck and the flood deck are a [`Pile`]: a face-down draw
//! stack and a face-up discard stack. When the draw stack runs out the discard
//! stack is shuffled back in; only when both are empty does a draw come up
//! empty-handed.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A draw stack plus its discard stack.
///
/// The top of each stack is the end of its `Vec`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pile<T> {
    draw: Vec<T>,
    discard: Vec<T>,
}

impl<T> Pile<T> {
    /// Create a pile from a set of cards, shuffled into the draw stack
    pub fn new<R: Rng>(mut cards: Vec<T>, rng: &mut R) -> Self {
        cards.shuffle(rng);
        Self {
            draw: cards,
            discard: Vec::new(),
        }
    }

    /// Create a pile with an exact stack order (last element is drawn first)
    pub fn from_parts(draw: Vec<T>, discard: Vec<T>) -> Self {
        Self { draw, discard }
    }

    /// Draw the top card.
    ///
    /// An empty draw stack is refilled from the shuffled discard stack first.
    /// Returns `None` only when both stacks are empty.
    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Option<T> {
        if self.draw.is_empty() {
            if self.discard.is_empty() {
                return None;
            }
            debug!(cards = self.discard.len(), "draw stack empty, reshuffling discards");
            self.reshuffle_discard(rng);
        }
        self.draw.pop()
    }

    /// Put a card on the discard stack
    pub fn discard(&mut self, card: T) {
        self.discard.push(card);
    }

    /// Move every discarded card into the draw stack and shuffle the result
    pub fn reshuffle_discard<R: Rng>(&mut self, rng: &mut R) {
        self.draw.append(&mut self.discard);
        self.draw.shuffle(rng);
    }

    /// Add fresh cards to the draw stack and shuffle it
    pub fn add_and_shuffle<R: Rng>(&mut self, cards: impl IntoIterator<Item = T>, rng: &mut R) {
        self.draw.extend(cards);
        self.draw.shuffle(rng);
    }

    /// Cards left in the draw stack
    pub fn draw_len(&self) -> usize {
        self.draw.len()
    }

    /// Cards in the discard stack
    pub fn discard_len(&self) -> usize {
        self.discard.len()
    }

    /// Cards held by this pile in either stack
    pub fn len(&self) -> usize {
        self.draw.len() + self.discard.len()
    }

    /// Whether both stacks are empty
    pub fn is_empty(&self) -> bool {
        self.draw.is_empty() && self.discard.is_empty()
    }

    /// The draw stack, bottom first
    pub fn draw_stack(&self) -> &[T] {
        &self.draw
    }

    /// The discard stack, bottom first
    pub fn discard_stack(&self) -> &[T] {
        &self.discard
    }
}

impl<T> Default for Pile<T> {
    fn default() -> Self {
        Self::from_parts(Vec::new(), Vec::new())
    }
}
