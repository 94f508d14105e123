pub mod card;
pub mod deck;
pub mod deck_set;
pub mod learning_card;
pub mod learning_session;
pub mod rating;
pub mod review_event;
pub mod scheduling_state;
pub mod sm2;
pub mod variation;

pub use card::Card;
pub use deck::Deck;
pub use deck_set::DeckSet;
pub use learning_card::LearningCard;
pub use learning_session::LearningSession;
pub use rating::{Grade, RatingLevel, RatingScale};
pub use review_event::{ReviewEvent, ReviewRecord};
pub use scheduling_state::SchedulingState;
pub use sm2::Sm2Scheduler;

pub type CardId = i64;
pub type DeckId = i64;
