//! Container for all available decks
use super::{Deck, DeckId};

#[derive(Clone, Debug, Default)]
pub struct DeckSet {
    pub decks: Vec<Deck>,
}

impl DeckSet {
    /// Ids of the decks that take part in pooled sessions.
    pub fn active_ids(&self) -> Vec<DeckId> {
        self.decks
            .iter()
            .filter(|deck| deck.is_active)
            .map(|deck| deck.id)
            .collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Deck> {
        self.decks.iter().find(|deck| deck.name == name)
    }

    pub fn find(&self, id: DeckId) -> Option<&Deck> {
        self.decks.iter().find(|deck| deck.id == id)
    }

    /// Keeps only the given ids that name an active deck, in the given order.
    pub fn filter_active(&self, ids: &[DeckId]) -> Vec<DeckId> {
        ids.iter()
            .copied()
            .filter(|&id| self.find(id).is_some_and(|deck| deck.is_active))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn deck(id: DeckId, name: &str, is_active: bool) -> Deck {
        Deck {
            id,
            name: name.to_string(),
            is_active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_active_ids() {
        let set = DeckSet {
            decks: vec![deck(1, "verbs", true), deck(2, "nouns", false), deck(3, "food", true)],
        };
        assert_eq!(set.active_ids(), vec![1, 3]);
        assert_eq!(set.filter_active(&[3, 2, 9]), vec![3]);
        assert_eq!(set.find_by_name("nouns").map(|d| d.id), Some(2));
        assert!(set.find_by_name("missing").is_none());
    }

    #[test]
    fn test_empty_set() {
        let set = DeckSet::default();
        assert!(set.active_ids().is_empty());
        assert!(set.filter_active(&[1]).is_empty());
    }
}
