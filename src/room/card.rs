//! Cards and the injected hand-evaluator seam. Card-strength ranking is out
//! of scope for this crate; the authority only needs an opaque, orderable
//! `HandRank` it can compare to pick showdown winners.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rank = match self.rank {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "T",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        };
        let suit = match self.suit {
            Suit::Clubs => "c",
            Suit::Diamonds => "d",
            Suit::Hearts => "h",
            Suit::Spades => "s",
        };
        write!(f, "{rank}{suit}")
    }
}

const RANKS: [Rank; 13] = [
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
    Rank::Nine,
    Rank::Ten,
    Rank::Jack,
    Rank::Queen,
    Rank::King,
    Rank::Ace,
];
const SUITS: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

/// A standard 52-card deck. Shuffling and dealing both take an injected
/// `Rng` so hands are replay-equivalent under a fixed seed.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn standard() -> Self {
        let mut cards = Vec::with_capacity(52);
        for suit in SUITS {
            for rank in RANKS {
                cards.push(Card { rank, suit });
            }
        }
        Self { cards }
    }

    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::standard();
        deck.cards.shuffle(rng);
        deck
    }

    pub fn deal(&mut self, n: usize) -> Vec<Card> {
        let at = self.cards.len().saturating_sub(n);
        self.cards.split_off(at)
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}

/// Opaque, orderable showdown strength. Higher wins; ties split the pot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct HandRank(pub u32);

/// Seam for plugging in a real hand-strength ranking function. The spec
/// fixes this surface and leaves the algorithm out of scope, so the
/// placeholder evaluator below is a test fixture, not a poker hand ranker.
pub trait HandEvaluator: Send + Sync {
    fn evaluate(&self, hole_cards: &[Card; 2], board: &[Card]) -> HandRank;
}

/// Ranks hands purely by summed card rank. Good enough to give tests a
/// deterministic, distinguishable ordering; not a real poker hand ranker.
#[derive(Clone, Copy, Debug, Default)]
pub struct HighCardSumEvaluator;

impl HandEvaluator for HighCardSumEvaluator {
    fn evaluate(&self, hole_cards: &[Card; 2], board: &[Card]) -> HandRank {
        let sum: u32 = hole_cards
            .iter()
            .chain(board.iter())
            .map(|c| c.rank as u32)
            .sum();
        HandRank(sum)
    }
}
