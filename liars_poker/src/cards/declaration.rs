//! Declared poker hands and their total order.
//!
//! A declaration is a claim about the union of every dealt card this round,
//! not about a single player's hand. Each call must be strictly greater than
//! the previous one under [`HandDeclaration::compare`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::{rank_name, Card, Rank, Suit, ACE};

/// The ten hand categories, ordered weakest to strongest.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandCategory {
    HighCard,
    Pair,
    TwoPairs,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
    RoyalFlush,
}

/// A structured hand declaration.
///
/// Invariants are upheld by the parser and by construction in tests:
/// `TwoPairs` holds `low < high`, `Flush.ranks` are 5 distinct ranks stored
/// descending, `Straight.start` is 2..=10, `StraightFlush.start` is 2..=9.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum HandDeclaration {
    HighCard { rank: Rank },
    Pair { rank: Rank },
    TwoPairs { low: Rank, high: Rank },
    ThreeOfAKind { rank: Rank },
    Straight { start: Rank },
    Flush { suit: Suit, ranks: [Rank; 5] },
    FullHouse { triple: Rank, pair: Rank },
    FourOfAKind { rank: Rank },
    StraightFlush { suit: Suit, start: Rank },
    RoyalFlush { suit: Suit },
}

impl HandDeclaration {
    pub fn category(&self) -> HandCategory {
        match self {
            Self::HighCard { .. } => HandCategory::HighCard,
            Self::Pair { .. } => HandCategory::Pair,
            Self::TwoPairs { .. } => HandCategory::TwoPairs,
            Self::ThreeOfAKind { .. } => HandCategory::ThreeOfAKind,
            Self::Straight { .. } => HandCategory::Straight,
            Self::Flush { .. } => HandCategory::Flush,
            Self::FullHouse { .. } => HandCategory::FullHouse,
            Self::FourOfAKind { .. } => HandCategory::FourOfAKind,
            Self::StraightFlush { .. } => HandCategory::StraightFlush,
            Self::RoyalFlush { .. } => HandCategory::RoyalFlush,
        }
    }

    /// Game-order comparison.
    ///
    /// Different categories compare by category ordinal. Within a category,
    /// tie-breaks follow the game rules: flushes compare by their highest
    /// rank only (same max means neither is greater), and royal flushes are
    /// all equal, which makes a royal flush terminal — nothing beats it.
    pub fn compare(&self, other: &Self) -> Ordering {
        match self.category().cmp(&other.category()) {
            Ordering::Equal => self.tiebreak(other),
            ord => ord,
        }
    }

    /// True when `self` is a legal raise over `other`.
    pub fn beats(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Greater
    }

    fn tiebreak(&self, other: &Self) -> Ordering {
        use HandDeclaration::*;
        match (self, other) {
            (HighCard { rank: a }, HighCard { rank: b })
            | (Pair { rank: a }, Pair { rank: b })
            | (ThreeOfAKind { rank: a }, ThreeOfAKind { rank: b })
            | (FourOfAKind { rank: a }, FourOfAKind { rank: b })
            | (Straight { start: a }, Straight { start: b })
            | (StraightFlush { start: a, .. }, StraightFlush { start: b, .. }) => a.cmp(b),
            (TwoPairs { low: l1, high: h1 }, TwoPairs { low: l2, high: h2 }) => {
                h1.cmp(h2).then(l1.cmp(l2))
            }
            (FullHouse { triple: t1, pair: p1 }, FullHouse { triple: t2, pair: p2 }) => {
                t1.cmp(t2).then(p1.cmp(p2))
            }
            // Flushes compare by max rank only; ties on max are equal.
            (Flush { ranks: r1, .. }, Flush { ranks: r2, .. }) => {
                let max1 = r1.iter().max().copied().unwrap_or(0);
                let max2 = r2.iter().max().copied().unwrap_or(0);
                max1.cmp(&max2)
            }
            (RoyalFlush { .. }, RoyalFlush { .. }) => Ordering::Equal,
            // Unreachable: both sides have the same category.
            _ => Ordering::Equal,
        }
    }

    /// Membership predicate: does this declared hand exist in the multiset
    /// of all dealt cards?
    pub fn holds_in(&self, cards: &[Card]) -> bool {
        let count_rank = |rank: Rank| cards.iter().filter(|c| c.rank == rank).count();
        let has_suited = |suit: Suit, rank: Rank| {
            cards.iter().any(|c| c.suit == suit && c.rank == rank)
        };
        match self {
            Self::HighCard { rank } => count_rank(*rank) >= 1,
            Self::Pair { rank } => count_rank(*rank) >= 2,
            Self::TwoPairs { low, high } => count_rank(*low) >= 2 && count_rank(*high) >= 2,
            Self::ThreeOfAKind { rank } => count_rank(*rank) >= 3,
            Self::FourOfAKind { rank } => count_rank(*rank) >= 4,
            Self::FullHouse { triple, pair } => count_rank(*triple) >= 3 && count_rank(*pair) >= 2,
            Self::Straight { start } => (0..5).all(|i| count_rank(start + i) >= 1),
            Self::Flush { suit, ranks } => ranks.iter().all(|r| has_suited(*suit, *r)),
            Self::StraightFlush { suit, start } => (0..5).all(|i| has_suited(*suit, start + i)),
            Self::RoyalFlush { suit } => (10..=ACE).all(|r| has_suited(*suit, r)),
        }
    }
}

/// Canonical long form, re-readable by the parser.
impl fmt::Display for HandDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HighCard { rank } => write!(f, "high card {}", rank_name(*rank)),
            Self::Pair { rank } => write!(f, "pair of {}s", rank_name(*rank)),
            Self::TwoPairs { low, high } => {
                write!(f, "two pairs {}s and {}s", rank_name(*high), rank_name(*low))
            }
            Self::ThreeOfAKind { rank } => write!(f, "three of a kind {}s", rank_name(*rank)),
            Self::Straight { start } => write!(f, "straight from {}", rank_name(*start)),
            Self::Flush { suit, ranks } => {
                let names: Vec<&str> = ranks.iter().map(|r| rank_name(*r)).collect();
                write!(f, "flush of {}: {}", suit, names.join(","))
            }
            Self::FullHouse { triple, pair } => {
                write!(f, "full house: 3 {}s and 2 {}s", rank_name(*triple), rank_name(*pair))
            }
            Self::FourOfAKind { rank } => write!(f, "four of a kind {}s", rank_name(*rank)),
            Self::StraightFlush { suit, start } => {
                write!(f, "straight flush {} from {}", suit, rank_name(*start))
            }
            Self::RoyalFlush { suit } => write!(f, "royal flush {}", suit),
        }
    }
}

/// Builds a flush rank array in canonical descending order.
pub(crate) fn flush_ranks(mut ranks: [Rank; 5]) -> [Rank; 5] {
    ranks.sort_unstable_by(|a, b| b.cmp(a));
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{parse_declaration, JACK, KING, QUEEN};

    fn pair(rank: Rank) -> HandDeclaration {
        HandDeclaration::Pair { rank }
    }

    #[test]
    fn category_ordinal_dominates() {
        let high_ace = HandDeclaration::HighCard { rank: ACE };
        let pair_two = pair(2);
        assert!(pair_two.beats(&high_ace));
        assert!(!high_ace.beats(&pair_two));
    }

    #[test]
    fn equal_declarations_are_not_a_raise() {
        assert_eq!(pair(KING).compare(&pair(KING)), Ordering::Equal);
        assert!(!pair(KING).beats(&pair(KING)));
        assert!(pair(ACE).beats(&pair(KING)));
    }

    #[test]
    fn two_pairs_compare_by_max_then_min() {
        let a = HandDeclaration::TwoPairs { low: 3, high: 9 };
        let b = HandDeclaration::TwoPairs { low: 7, high: 9 };
        let c = HandDeclaration::TwoPairs { low: 2, high: 10 };
        assert!(b.beats(&a));
        assert!(c.beats(&b));
    }

    #[test]
    fn full_house_compares_triple_then_pair() {
        let a = HandDeclaration::FullHouse { triple: 9, pair: ACE };
        let b = HandDeclaration::FullHouse { triple: 10, pair: 2 };
        assert!(b.beats(&a));
        let c = HandDeclaration::FullHouse { triple: 10, pair: 3 };
        assert!(c.beats(&b));
    }

    #[test]
    fn flush_ties_on_max_rank_are_equal() {
        let a = HandDeclaration::Flush { suit: Suit::Hearts, ranks: flush_ranks([ACE, 9, 7, 5, 2]) };
        let b = HandDeclaration::Flush { suit: Suit::Spades, ranks: flush_ranks([ACE, KING, QUEEN, JACK, 3]) };
        assert_eq!(a.compare(&b), Ordering::Equal);
        assert!(!a.beats(&b));
        assert!(!b.beats(&a));

        let lower = HandDeclaration::Flush { suit: Suit::Clubs, ranks: flush_ranks([KING, 9, 7, 5, 2]) };
        assert!(a.beats(&lower));
    }

    #[test]
    fn royal_flushes_are_all_equal() {
        let hearts = HandDeclaration::RoyalFlush { suit: Suit::Hearts };
        let spades = HandDeclaration::RoyalFlush { suit: Suit::Spades };
        assert_eq!(hearts.compare(&spades), Ordering::Equal);
        assert!(!spades.beats(&hearts));
        // And nothing in a lower category beats one.
        let quads = HandDeclaration::FourOfAKind { rank: ACE };
        assert!(!quads.beats(&hearts));
    }

    #[test]
    fn membership_counts_ranks() {
        let cards = [
            Card::new(Suit::Hearts, KING),
            Card::new(Suit::Clubs, KING),
            Card::new(Suit::Spades, 4),
        ];
        assert!(pair(KING).holds_in(&cards));
        assert!(!pair(4).holds_in(&cards));
        assert!(HandDeclaration::HighCard { rank: 4 }.holds_in(&cards));
        assert!(!HandDeclaration::ThreeOfAKind { rank: KING }.holds_in(&cards));
    }

    #[test]
    fn membership_straight_and_suited_runs() {
        let run: Vec<Card> = (5..=9).map(|r| Card::new(Suit::Diamonds, r)).collect();
        assert!(HandDeclaration::Straight { start: 5 }.holds_in(&run));
        assert!(HandDeclaration::StraightFlush { suit: Suit::Diamonds, start: 5 }.holds_in(&run));
        assert!(!HandDeclaration::StraightFlush { suit: Suit::Hearts, start: 5 }.holds_in(&run));
        assert!(!HandDeclaration::Straight { start: 6 }.holds_in(&run));

        let mixed: Vec<Card> = (5..=9)
            .map(|r| Card::new(if r == 7 { Suit::Hearts } else { Suit::Diamonds }, r))
            .collect();
        assert!(HandDeclaration::Straight { start: 5 }.holds_in(&mixed));
        assert!(!HandDeclaration::StraightFlush { suit: Suit::Diamonds, start: 5 }.holds_in(&mixed));
    }

    #[test]
    fn membership_royal_flush() {
        let royal: Vec<Card> = (10..=ACE).map(|r| Card::new(Suit::Spades, r)).collect();
        assert!(HandDeclaration::RoyalFlush { suit: Suit::Spades }.holds_in(&royal));
        assert!(!HandDeclaration::RoyalFlush { suit: Suit::Hearts }.holds_in(&royal));
    }

    #[test]
    fn display_round_trips_through_parser() {
        let declarations = vec![
            HandDeclaration::HighCard { rank: 10 },
            pair(KING),
            HandDeclaration::TwoPairs { low: 3, high: 7 },
            HandDeclaration::ThreeOfAKind { rank: QUEEN },
            HandDeclaration::Straight { start: 10 },
            HandDeclaration::Flush { suit: Suit::Hearts, ranks: flush_ranks([2, 5, 7, KING, ACE]) },
            HandDeclaration::FullHouse { triple: 3, pair: 10 },
            HandDeclaration::FourOfAKind { rank: ACE },
            HandDeclaration::StraightFlush { suit: Suit::Spades, start: 9 },
            HandDeclaration::RoyalFlush { suit: Suit::Diamonds },
        ];
        for declaration in declarations {
            let rendered = declaration.to_string();
            let reparsed = parse_declaration(&rendered)
                .unwrap_or_else(|e| panic!("failed to reparse `{rendered}`: {e}"));
            assert_eq!(reparsed, declaration, "round-trip of `{rendered}`");
        }
    }
}
