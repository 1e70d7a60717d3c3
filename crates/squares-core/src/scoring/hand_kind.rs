use crate::model::card::Card;
use crate::model::rank::Rank;
use crate::model::suit::Suit;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Poker hand categories, weakest first. The discriminant indexes point
/// tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HandKind {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
    RoyalFlush = 9,
}

impl HandKind {
    pub const COUNT: usize = 10;

    pub const ALL: [HandKind; 10] = [
        HandKind::HighCard,
        HandKind::OnePair,
        HandKind::TwoPair,
        HandKind::ThreeOfAKind,
        HandKind::Straight,
        HandKind::Flush,
        HandKind::FullHouse,
        HandKind::FourOfAKind,
        HandKind::StraightFlush,
        HandKind::RoyalFlush,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            HandKind::HighCard => "high_card",
            HandKind::OnePair => "one_pair",
            HandKind::TwoPair => "two_pair",
            HandKind::ThreeOfAKind => "three_of_a_kind",
            HandKind::Straight => "straight",
            HandKind::Flush => "flush",
            HandKind::FullHouse => "full_house",
            HandKind::FourOfAKind => "four_of_a_kind",
            HandKind::StraightFlush => "straight_flush",
            HandKind::RoyalFlush => "royal_flush",
        }
    }

    /// Classify up to five cards. Missing cards contribute nothing, so a
    /// partial line can still hold pairs, trips or quads, while straights
    /// and flushes need all five.
    pub fn classify<'a, I>(cards: I) -> HandKind
    where
        I: IntoIterator<Item = &'a Option<Card>>,
    {
        let mut rank_counts = [0u8; Rank::COUNT];
        let mut suit_counts = [0u8; Suit::COUNT];
        let mut len = 0usize;
        for card in cards.into_iter().flatten() {
            rank_counts[card.rank.index()] += 1;
            suit_counts[card.suit.index()] += 1;
            len += 1;
        }

        let flush = len == 5 && suit_counts.contains(&5);
        let (straight, ace_high) = if len == 5 {
            straight_shape(&rank_counts)
        } else {
            (false, false)
        };

        if straight && flush {
            return if ace_high {
                HandKind::RoyalFlush
            } else {
                HandKind::StraightFlush
            };
        }

        let max_of_a_kind = rank_counts.iter().copied().max().unwrap_or(0);
        let pairs = rank_counts.iter().filter(|&&count| count == 2).count();

        if max_of_a_kind == 4 {
            HandKind::FourOfAKind
        } else if max_of_a_kind == 3 && pairs == 1 {
            HandKind::FullHouse
        } else if flush {
            HandKind::Flush
        } else if straight {
            HandKind::Straight
        } else if max_of_a_kind == 3 {
            HandKind::ThreeOfAKind
        } else if pairs == 2 {
            HandKind::TwoPair
        } else if pairs == 1 {
            HandKind::OnePair
        } else {
            HandKind::HighCard
        }
    }
}

impl fmt::Display for HandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns `(is_straight, is_ten_to_ace)` for five cards.
fn straight_shape(rank_counts: &[u8; Rank::COUNT]) -> (bool, bool) {
    if rank_counts.iter().any(|&count| count > 1) {
        return (false, false);
    }
    let ace = Rank::Ace.index();
    let low = rank_counts.iter().position(|&count| count == 1);
    let high = rank_counts.iter().rposition(|&count| count == 1);
    match (low, high) {
        (Some(low), Some(high)) if high - low == 4 => (true, high == ace),
        // A-2-3-4-5: the ace plays low.
        (Some(0), Some(high)) if high == ace => {
            let wheel = (0..4).all(|index| rank_counts[index] == 1);
            (wheel, false)
        }
        _ => (false, false),
    }
}
