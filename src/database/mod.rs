pub mod db;
pub mod selector;
pub mod stats;

pub use selector::CardSelector;
