//! 7-bag randomizer and the tray of upcoming pieces.

use super::piece::PieceKind;
use rand::Rng;
use rand::seq::SliceRandom;

/// Bag of 7 tetrominoes (random order, then refill).
#[derive(Debug, Clone, Default)]
pub struct Bag {
    queue: Vec<PieceKind>,
}

impl Bag {
    pub fn new() -> Self {
        Self {
            queue: Vec::with_capacity(PieceKind::ALL.len()),
        }
    }

    fn refill<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.queue.extend_from_slice(&PieceKind::ALL);
        self.queue.shuffle(rng);
    }

    /// Draw the next kind, reshuffling a fresh bag once the current one is spent.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> PieceKind {
        if self.queue.is_empty() {
            self.refill(rng);
        }
        // refill() always leaves seven entries
        self.queue.pop().unwrap_or(PieceKind::I)
    }

    /// Pieces left before the next reshuffle.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

/// Fixed row of preview slots the player picks pieces from.
#[derive(Debug, Clone)]
pub struct Tray {
    slots: Vec<Option<PieceKind>>,
}

impl Tray {
    pub fn new<R: Rng + ?Sized>(size: usize, bag: &mut Bag, rng: &mut R) -> Self {
        let slots = (0..size).map(|_| Some(bag.draw(rng))).collect();
        Self { slots }
    }

    pub fn slots(&self) -> &[Option<PieceKind>] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<PieceKind> {
        self.slots.get(slot).copied().flatten()
    }

    pub fn take(&mut self, slot: usize) -> Option<PieceKind> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    pub fn refill<R: Rng + ?Sized>(&mut self, slot: usize, bag: &mut Bag, rng: &mut R) {
        if let Some(s) = self.slots.get_mut(slot) {
            *s = Some(bag.draw(rng));
        }
    }
}
