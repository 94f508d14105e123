//! Picks drills so the same (fact, variant) pair does not come back within a
//! short window, e.g. the same verb in the same tense twice in a row.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use crate::config::DEFAULT_VARIATION_WINDOW;
use crate::error::{Result, SchedulerError};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactVariant {
    pub fact_id: String,
    pub variant_id: String,
}

/// One drillable unit: a fact combined with the transformation to test.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub fact_id: String,
    pub variant_id: String,
    /// The fact as shown to the learner, e.g. "γράφω".
    pub fact_text: String,
    /// Gloss of the fact, e.g. "to write".
    pub fact_gloss: String,
    /// Human readable name of the variant, e.g. "past tense".
    pub variant_label: String,
}

impl Candidate {
    pub fn key(&self) -> FactVariant {
        FactVariant {
            fact_id: self.fact_id.clone(),
            variant_id: self.variant_id.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub id: String,
    pub text: String,
    pub gloss: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub label: String,
}

/// Every fact drilled in every variant.
pub fn combinations(facts: &[Fact], variants: &[Variant]) -> Vec<Candidate> {
    facts
        .iter()
        .flat_map(|fact| {
            variants.iter().map(move |variant| Candidate {
                fact_id: fact.id.clone(),
                variant_id: variant.id.clone(),
                fact_text: fact.text.clone(),
                fact_gloss: fact.gloss.clone(),
                variant_label: variant.label.clone(),
            })
        })
        .collect()
}

/// Rolling window of recent picks, owned by the caller's session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredHistory")]
pub struct VariationHistory {
    window: usize,
    recent: VecDeque<FactVariant>,
}

/// Serialized form; may hold more entries than its window.
#[derive(Deserialize)]
struct StoredHistory {
    window: usize,
    recent: VecDeque<FactVariant>,
}

impl From<StoredHistory> for VariationHistory {
    fn from(stored: StoredHistory) -> Self {
        let mut history = VariationHistory::new(stored.window);
        for key in stored.recent {
            history.push(key);
        }
        history
    }
}

impl Default for VariationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_VARIATION_WINDOW)
    }
}

impl VariationHistory {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            recent: VecDeque::with_capacity(window),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn contains(&self, key: &FactVariant) -> bool {
        self.recent.contains(key)
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &FactVariant> {
        self.recent.iter()
    }

    fn push(&mut self, key: FactVariant) {
        self.recent.push_back(key);
        while self.recent.len() > self.window {
            self.recent.pop_front();
        }
    }
}

/// Chooses a candidate not seen in the recent window, uniformly at random.
///
/// When every candidate was seen recently the whole set is used instead, so
/// a candidate universe smaller than the window never stalls. Returns the
/// pick together with the history extended by it.
pub fn pick<'a, R: Rng + ?Sized>(
    candidates: &'a [Candidate],
    history: &VariationHistory,
    rng: &mut R,
) -> Result<(&'a Candidate, VariationHistory)> {
    let recent: HashSet<&FactVariant> = history.recent.iter().collect();
    let fresh: Vec<&Candidate> = candidates
        .iter()
        .filter(|candidate| !recent.contains(&candidate.key()))
        .collect();

    let chosen = if fresh.is_empty() {
        log::debug!(
            "all {} candidates seen in the last {} picks, choosing from the full set",
            candidates.len(),
            history.window
        );
        candidates.choose(rng)
    } else {
        fresh.choose(rng).copied()
    };
    let chosen = chosen.ok_or(SchedulerError::NoCandidates)?;

    let mut updated = history.clone();
    updated.push(chosen.key());
    Ok((chosen, updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn fact(id: &str) -> Fact {
        Fact {
            id: id.to_string(),
            text: id.to_string(),
            gloss: format!("gloss of {id}"),
        }
    }

    fn variant(id: &str) -> Variant {
        Variant {
            id: id.to_string(),
            label: id.to_string(),
        }
    }

    fn key(fact_id: &str, variant_id: &str) -> FactVariant {
        FactVariant {
            fact_id: fact_id.to_string(),
            variant_id: variant_id.to_string(),
        }
    }

    fn history_of(window: usize, keys: &[(&str, &str)]) -> VariationHistory {
        let mut history = VariationHistory::new(window);
        for (f, v) in keys {
            history.push(key(f, v));
        }
        history
    }

    #[test]
    fn test_combinations() {
        let candidates =
            combinations(&[fact("γράφω"), fact("διαβάζω")], &[variant("A"), variant("B")]);
        assert_eq!(candidates.len(), 4);
        assert_eq!(candidates[0].key(), key("γράφω", "A"));
        assert_eq!(candidates[3].key(), key("διαβάζω", "B"));
    }

    #[test]
    fn test_pick_avoids_recent_pairs() {
        let mut rng = StdRng::seed_from_u64(7);
        let candidates =
            combinations(&[fact("γράφω"), fact("διαβάζω")], &[variant("A"), variant("B")]);
        let history = history_of(10, &[("γράφω", "A"), ("γράφω", "B")]);

        for _ in 0..20 {
            let (chosen, _) = pick(&candidates, &history, &mut rng).unwrap();
            assert_eq!(chosen.fact_id, "διαβάζω");
        }
    }

    #[test]
    fn test_pick_falls_back_when_all_recent() {
        let mut rng = StdRng::seed_from_u64(7);
        let candidates = combinations(&[fact("γράφω")], &[variant("A")]);
        let history = history_of(10, &[("γράφω", "A")]);

        let (chosen, updated) = pick(&candidates, &history, &mut rng).unwrap();
        assert_eq!(chosen.key(), key("γράφω", "A"));
        assert_eq!(updated.len(), 2);
    }

    #[test]
    fn test_pick_never_stalls_with_small_universe() {
        let mut rng = StdRng::seed_from_u64(42);
        let candidates = combinations(&[fact("a"), fact("b")], &[variant("x")]);
        let mut history = VariationHistory::new(10);

        for _ in 0..50 {
            let (chosen, updated) = pick(&candidates, &history, &mut rng).unwrap();
            assert!(candidates.contains(chosen));
            history = updated;
            assert!(history.len() <= 10);
        }
    }

    #[test]
    fn test_pick_only_recent_when_forced() {
        let mut rng = StdRng::seed_from_u64(3);
        let candidates = combinations(&[fact("a"), fact("b"), fact("c")], &[variant("x")]);
        let mut history = VariationHistory::new(2);

        for _ in 0..60 {
            let (chosen, updated) = pick(&candidates, &history, &mut rng).unwrap();
            // Window of two with three candidates: there is always a fresh one.
            assert!(!history.contains(&chosen.key()));
            history = updated;
        }
    }

    #[test]
    fn test_history_limited_to_window() {
        let mut rng = StdRng::seed_from_u64(1);
        let facts: Vec<Fact> = (0..20).map(|i| fact(&format!("word{i}"))).collect();
        let candidates = combinations(&facts, &[variant("A")]);
        let mut history = VariationHistory::default();

        for _ in 0..15 {
            let (_, updated) = pick(&candidates, &history, &mut rng).unwrap();
            history = updated;
        }
        assert_eq!(history.len(), DEFAULT_VARIATION_WINDOW);
    }

    #[test]
    fn test_history_updated_with_pick() {
        let mut rng = StdRng::seed_from_u64(5);
        let candidates = combinations(&[fact("γράφω")], &[variant("A"), variant("B")]);
        let history = VariationHistory::default();

        let (chosen, updated) = pick(&candidates, &history, &mut rng).unwrap();
        assert!(history.is_empty());
        assert_eq!(updated.iter().collect::<Vec<_>>(), vec![&chosen.key()]);
    }

    #[test]
    fn test_history_keeps_most_recent() {
        let history = history_of(2, &[("a", "x"), ("b", "x"), ("c", "x")]);
        let keys: Vec<&FactVariant> = history.iter().collect();
        assert_eq!(keys, vec![&key("b", "x"), &key("c", "x")]);
    }

    #[test]
    fn test_pick_distributes_across_facts() {
        let mut rng = StdRng::seed_from_u64(11);
        let candidates = combinations(&[fact("w1"), fact("w2"), fact("w3")], &[variant("A")]);
        let mut history = VariationHistory::default();
        let mut seen = HashSet::new();

        for _ in 0..10 {
            let (chosen, updated) = pick(&candidates, &history, &mut rng).unwrap();
            seen.insert(chosen.fact_id.clone());
            history = updated;
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_loaded_history_keeps_only_window() {
        let json = r#"{
  "window": 2,
  "recent": [
    { "fact_id": "a", "variant_id": "x" },
    { "fact_id": "b", "variant_id": "x" },
    { "fact_id": "c", "variant_id": "x" }
  ]
}"#;
        let history: VariationHistory = serde_json::from_str(json).unwrap();
        assert_eq!(history.len(), 2);
        assert!(!history.contains(&key("a", "x")));

        // "a" fell out of the window, so it is the only fresh candidate
        let mut rng = StdRng::seed_from_u64(9);
        let candidates = combinations(&[fact("a"), fact("b"), fact("c")], &[variant("x")]);
        for _ in 0..10 {
            let (chosen, _) = pick(&candidates, &history, &mut rng).unwrap();
            assert_eq!(chosen.fact_id, "a");
        }
    }

    #[test]
    fn test_pick_from_nothing() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = pick(&[], &VariationHistory::default(), &mut rng);
        assert!(matches!(result, Err(SchedulerError::NoCandidates)));
    }

    #[test]
    fn test_zero_window_keeps_no_history() {
        let mut rng = StdRng::seed_from_u64(0);
        let candidates = combinations(&[fact("a")], &[variant("x")]);
        let (_, updated) = pick(&candidates, &VariationHistory::new(0), &mut rng).unwrap();
        assert!(updated.is_empty());
    }
}
