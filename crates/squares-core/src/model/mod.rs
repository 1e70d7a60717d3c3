pub mod card;
pub mod deck;
pub mod grid;
pub mod rank;
pub mod suit;
