//! Cards, decks, and the declared-hand model.
//!
//! The game is played with a single standard 52-card deck. Aces are always
//! high (rank 14); there is no low-ace straight.

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod declaration;
pub mod parser;

pub use declaration::{HandCategory, HandDeclaration};
pub use parser::{parse_declaration, ParseError};

/// Card rank as its numeric value: 2..=10, Jack=11, Queen=12, King=13, Ace=14.
pub type Rank = u8;

pub const JACK: Rank = 11;
pub const QUEEN: Rank = 12;
pub const KING: Rank = 13;
pub const ACE: Rank = 14;

/// All valid ranks, low to high.
pub const RANKS: std::ops::RangeInclusive<Rank> = 2..=ACE;

/// Long-form name used by declaration display and the parser.
pub fn rank_name(rank: Rank) -> &'static str {
    match rank {
        2 => "2",
        3 => "3",
        4 => "4",
        5 => "5",
        6 => "6",
        7 => "7",
        8 => "8",
        9 => "9",
        10 => "10",
        JACK => "jack",
        QUEEN => "queen",
        KING => "king",
        ACE => "ace",
        _ => "?",
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    /// Lowercase plural name, matching the wire representation.
    pub fn name(self) -> &'static str {
        match self {
            Suit::Hearts => "hearts",
            Suit::Diamonds => "diamonds",
            Suit::Clubs => "clubs",
            Suit::Spades => "spades",
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
            Suit::Spades => '♠',
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A playing card. Serializes as `{"suit": "hearts", "rank": 13}`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub const fn new(suit: Suit, rank: Rank) -> Self {
        Self { suit, rank }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rank = match self.rank {
            JACK => "J".to_string(),
            QUEEN => "Q".to_string(),
            KING => "K".to_string(),
            ACE => "A".to_string(),
            r => r.to_string(),
        };
        write!(f, "{rank}{}", self.suit.glyph())
    }
}

/// A deck of cards. Fresh decks hold the 52 distinct cards; dealing removes
/// cards from the top.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// The standard 52-card deck in suit-major order.
    pub fn standard() -> Self {
        let mut cards = Vec::with_capacity(52);
        for suit in Suit::ALL {
            for rank in RANKS {
                cards.push(Card::new(suit, rank));
            }
        }
        Self { cards }
    }

    /// A fresh deck shuffled with the given generator.
    pub fn shuffled(rng: &mut StdRng) -> Self {
        let mut deck = Self::standard();
        deck.cards.shuffle(rng);
        deck
    }

    /// Deal `count` cards off the top. Panics are avoided by dealing at most
    /// the remaining cards; callers never request more than 52 in total.
    pub fn deal(&mut self, count: usize) -> Vec<Card> {
        let take = count.min(self.cards.len());
        self.cards.split_off(self.cards.len() - take)
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}

/// RNG used for shuffling, starting-seat selection, and replacement-host
/// selection. Seedable so tests are deterministic; production seeds from OS
/// entropy so clients cannot predict deals.
pub fn game_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Pick a uniformly random element index.
pub fn pick_index(rng: &mut StdRng, len: usize) -> usize {
    rng.gen_range(0..len)
}
