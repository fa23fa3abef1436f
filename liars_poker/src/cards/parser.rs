//! Parser for hand declarations.
//!
//! Accepts the canonical long forms (`"pair of kings"`, `"two pairs 3 and
//! 7"`, `"flush of hearts: 2,5,7,king,ace"`, `"full house: 3 jacks and 2
//! 10s"`, `"straight from 10"`, `"straight flush spades from 9"`, `"royal
//! flush diamonds"`). Ranks accept digits and `j/jack`, `q/queen`, `k/king`,
//! `a/ace`; suits accept their names and Unicode glyphs; plural `s` is
//! stripped. Implemented as a hand-written descent over a tokenized,
//! lowercased input.

use thiserror::Error;

use super::{declaration::flush_ranks, HandDeclaration, Rank, Suit, ACE, JACK, KING, QUEEN};

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ParseError {
    #[error("cannot parse hand specification `{0}`")]
    UnrecognizedSpec(String),
    #[error("unknown rank `{0}`")]
    UnknownRank(String),
    #[error("unknown suit `{0}`")]
    UnknownSuit(String),
    #[error("a straight cannot start above 10")]
    StraightStartTooHigh,
    #[error("a straight flush cannot start above 9")]
    StraightFlushStartTooHigh,
    #[error("two pairs must name two different ranks")]
    DuplicatePairRanks,
    #[error("full house triple and pair ranks must differ")]
    DuplicateFullHouseRanks,
    #[error("a flush must name exactly 5 distinct ranks")]
    FlushRankCount,
}

/// Parse a hand specification into a structured declaration.
pub fn parse_declaration(input: &str) -> Result<HandDeclaration, ParseError> {
    let normalized = input.trim().to_lowercase();
    let tokens: Vec<&str> = normalized
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | ':' | '-' | ';'))
        .filter(|t| !t.is_empty())
        .collect();

    let unrecognized = || ParseError::UnrecognizedSpec(input.trim().to_string());

    match tokens.as_slice() {
        ["royal", "flush", suit] => Ok(HandDeclaration::RoyalFlush { suit: parse_suit(suit)? }),
        ["straight", "flush", suit, "from", rank] => {
            let suit = parse_suit(suit)?;
            let start = parse_rank(rank)?;
            if start > 9 {
                return Err(ParseError::StraightFlushStartTooHigh);
            }
            Ok(HandDeclaration::StraightFlush { suit, start })
        }
        ["straight", "from", rank] => {
            let start = parse_rank(rank)?;
            if start > 10 {
                return Err(ParseError::StraightStartTooHigh);
            }
            Ok(HandDeclaration::Straight { start })
        }
        ["flush", rest @ ..] => {
            let rest = match rest {
                ["of", tail @ ..] => tail,
                tail => tail,
            };
            let (suit, ranks) = match rest {
                [suit, ranks @ ..] => (parse_suit(suit)?, ranks),
                [] => return Err(unrecognized()),
            };
            if ranks.len() != 5 {
                return Err(ParseError::FlushRankCount);
            }
            let mut parsed = [0 as Rank; 5];
            for (slot, token) in parsed.iter_mut().zip(ranks) {
                *slot = parse_rank(token)?;
            }
            let distinct: std::collections::HashSet<Rank> = parsed.iter().copied().collect();
            if distinct.len() != 5 {
                return Err(ParseError::FlushRankCount);
            }
            Ok(HandDeclaration::Flush { suit, ranks: flush_ranks(parsed) })
        }
        ["full", "house", "3", triple, "and", "2", pair] => {
            let triple = parse_rank(triple)?;
            let pair = parse_rank(pair)?;
            if triple == pair {
                return Err(ParseError::DuplicateFullHouseRanks);
            }
            Ok(HandDeclaration::FullHouse { triple, pair })
        }
        ["two", "pairs" | "pair", first, "and", second] => {
            let first = parse_rank(first)?;
            let second = parse_rank(second)?;
            if first == second {
                return Err(ParseError::DuplicatePairRanks);
            }
            Ok(HandDeclaration::TwoPairs { low: first.min(second), high: first.max(second) })
        }
        ["three" | "3", "of", "a", "kind", rank] => {
            Ok(HandDeclaration::ThreeOfAKind { rank: parse_rank(rank)? })
        }
        ["four" | "4", "of", "a", "kind", rank] => {
            Ok(HandDeclaration::FourOfAKind { rank: parse_rank(rank)? })
        }
        ["pair", "of", rank] | ["pair", rank] => {
            Ok(HandDeclaration::Pair { rank: parse_rank(rank)? })
        }
        ["high", "card", rank] | ["highcard", rank] => {
            Ok(HandDeclaration::HighCard { rank: parse_rank(rank)? })
        }
        _ => Err(unrecognized()),
    }
}

fn parse_rank(token: &str) -> Result<Rank, ParseError> {
    let stripped = token.trim_end_matches('s');
    match stripped {
        "2" => Ok(2),
        "3" => Ok(3),
        "4" => Ok(4),
        "5" => Ok(5),
        "6" => Ok(6),
        "7" => Ok(7),
        "8" => Ok(8),
        "9" => Ok(9),
        "10" => Ok(10),
        "j" | "jack" => Ok(JACK),
        "q" | "queen" => Ok(QUEEN),
        "k" | "king" => Ok(KING),
        "a" | "ace" => Ok(ACE),
        _ => Err(ParseError::UnknownRank(token.to_string())),
    }
}

fn parse_suit(token: &str) -> Result<Suit, ParseError> {
    let stripped = token.trim_end_matches('s');
    match stripped {
        "heart" | "♥" => Ok(Suit::Hearts),
        "diamond" | "♦" => Ok(Suit::Diamonds),
        "club" | "♣" => Ok(Suit::Clubs),
        "spade" | "♠" => Ok(Suit::Spades),
        _ => Err(ParseError::UnknownSuit(token.to_string())),
    }
}
