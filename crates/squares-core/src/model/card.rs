use crate::model::rank::Rank;
use crate::model::suit::Suit;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const DECK_SIZE: usize = Rank::COUNT * Suit::COUNT;

    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    /// Dense index in `0..52`, suit-major.
    pub const fn index(self) -> usize {
        self.suit.index() * Rank::COUNT + self.rank.index()
    }

    pub const fn from_index(index: usize) -> Option<Self> {
        if index >= Self::DECK_SIZE {
            return None;
        }
        Some(Self::at(index))
    }

    /// Every card, in [`index`](Self::index) order.
    pub fn all() -> [Card; Self::DECK_SIZE] {
        core::array::from_fn(Self::at)
    }

    const fn at(index: usize) -> Self {
        Self::new(
            Rank::ORDERED[index % Rank::COUNT],
            Suit::ALL[index / Rank::COUNT],
        )
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCardError {
    Empty,
    UnknownRank(String),
    UnknownSuit(char),
}

impl fmt::Display for ParseCardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCardError::Empty => f.write_str("empty card code"),
            ParseCardError::UnknownRank(rank) => write!(f, "unknown rank '{rank}'"),
            ParseCardError::UnknownSuit(suit) => write!(f, "unknown suit '{suit}'"),
        }
    }
}

impl std::error::Error for ParseCardError {}

impl FromStr for Card {
    type Err = ParseCardError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let suit_char = text.chars().last().ok_or(ParseCardError::Empty)?;
        let rank_text = &text[..text.len() - suit_char.len_utf8()];
        let rank = Rank::from_symbol(rank_text)
            .ok_or_else(|| ParseCardError::UnknownRank(rank_text.to_string()))?;
        let suit = Suit::from_symbol(suit_char).ok_or(ParseCardError::UnknownSuit(suit_char))?;
        Ok(Card::new(rank, suit))
    }
}

#[cfg(test)]
mod tests {
    use super::{Card, ParseCardError, Rank, Suit};

    #[test]
    fn index_roundtrips_for_every_card() {
        for index in 0..Card::DECK_SIZE {
            let card = Card::from_index(index).expect("index in range");
            assert_eq!(card.index(), index);
        }
        assert_eq!(Card::from_index(Card::DECK_SIZE), None);
    }

    #[test]
    fn all_lists_cards_in_index_order() {
        let cards = Card::all();
        for (position, card) in cards.iter().enumerate() {
            assert_eq!(card.index(), position);
            assert_eq!(Card::from_index(position), Some(*card));
        }
    }

    #[test]
    fn parses_two_character_codes() {
        assert_eq!("AS".parse::<Card>(), Ok(Card::new(Rank::Ace, Suit::Spades)));
        assert_eq!("td".parse::<Card>(), Ok(Card::new(Rank::Ten, Suit::Diamonds)));
        assert_eq!("10H".parse::<Card>(), Ok(Card::new(Rank::Ten, Suit::Hearts)));
    }

    #[test]
    fn rejects_malformed_codes() {
        assert_eq!("".parse::<Card>(), Err(ParseCardError::Empty));
        assert_eq!("1S".parse::<Card>(), Err(ParseCardError::UnknownRank("1".into())));
        assert_eq!("AX".parse::<Card>(), Err(ParseCardError::UnknownSuit('X')));
    }

    #[test]
    fn display_matches_parse() {
        let card = Card::new(Rank::Ten, Suit::Clubs);
        assert_eq!(card.to_string(), "TC");
        assert_eq!(card.to_string().parse::<Card>(), Ok(card));
    }
}
