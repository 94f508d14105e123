pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod session;

pub use config::Config;
pub use error::{Result, SchedulerError};
pub use models::{
    Card, Deck, DeckSet, Grade, LearningSession, RatingScale, SchedulingState, Sm2Scheduler,
};
pub use session::{MixPolicy, build_session};
