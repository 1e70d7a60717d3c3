use crate::model::card::Card;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// An ordered sequence of distinct cards. The standard deck lists every card
/// in [`Card::index`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn standard() -> Self {
        Self {
            cards: Card::all().to_vec(),
        }
    }

    pub fn shuffled<R: rand::Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::standard();
        deck.shuffle_in_place(rng);
        deck
    }

    pub fn shuffled_with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::shuffled(&mut rng)
    }

    /// Build a deck with a fixed prefix (e.g. a scripted deal) followed by
    /// every remaining card in standard order. Duplicates in `prefix` are
    /// dropped.
    pub fn with_prefix(prefix: &[Card]) -> Self {
        let mut seen = [false; Card::DECK_SIZE];
        let mut cards = Vec::with_capacity(Card::DECK_SIZE);
        for card in prefix.iter().copied().chain(Self::standard().cards) {
            if !seen[card.index()] {
                seen[card.index()] = true;
                cards.push(card);
            }
        }
        Self { cards }
    }

    pub fn shuffle_in_place<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<Card> {
        self.cards.get(position).copied()
    }
}
