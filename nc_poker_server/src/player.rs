// Per-connection player state.
//
// Owned exclusively by `Session`; nothing outside `session.rs` and the
// choice validator mutates it. A player is created empty on admission and
// receives a hand only when the game starts.

use nc_poker_protocol::PlayerId;

use crate::hand::Hand;

#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub hand: Hand,
    /// Numbers already played, in play order. Only ever grows.
    pub chosen: Vec<u32>,
    /// This round's choice, cleared when a round opens.
    pub current_choice: Option<u32>,
    /// Whether a submission would be considered right now.
    pub eligible: bool,
    pub score: u32,
}

impl Player {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            hand: Hand::from_numbers([]),
            chosen: Vec::new(),
            current_choice: None,
            eligible: false,
            score: 0,
        }
    }

    /// Numbers from the hand not yet played, ascending.
    pub fn remaining(&self) -> Vec<u32> {
        self.hand
            .numbers()
            .iter()
            .copied()
            .filter(|n| !self.chosen.contains(n))
            .collect()
    }

    pub fn has_remaining(&self, n: u32) -> bool {
        self.hand.contains(n) && !self.chosen.contains(&n)
    }

    /// Give the player a fresh hand at game start.
    pub fn deal(&mut self, hand: Hand) {
        self.hand = hand;
        self.chosen.clear();
        self.current_choice = None;
        self.eligible = false;
    }

    /// Reset per-round state when a round opens.
    pub fn open_round(&mut self) {
        self.current_choice = None;
        self.eligible = true;
    }
}
