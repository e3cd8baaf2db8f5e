//! Seed grounding: direct descriptor matching of object mentions.

use std::collections::{BTreeMap, BTreeSet};

use crate::mention::{MentionId, MentionSet};
use crate::scene::Scene;

/// Result of matching every object mention against the scene.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedGrounding {
    /// Mention → matching entities, for mentions with at least one match.
    pub matches: BTreeMap<MentionId, Vec<usize>>,
    /// Entities of confidently grounded mentions.
    pub true_nodes: BTreeSet<usize>,
    /// Mentions matching no entity, in mention order.
    pub ungrounded: Vec<MentionId>,
}

impl SeedGrounding {
    /// Entities matched by `mention`, empty when ungrounded.
    pub fn matches_of(&self, mention: MentionId) -> &[usize] {
        self.matches.get(&mention).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `mention` matched between 1 and `max_matches` entities.
    pub fn is_confident(&self, mention: MentionId, max_matches: usize) -> bool {
        let n = self.matches_of(mention).len();
        n >= 1 && n <= max_matches
    }
}

/// Match each object mention's descriptor against every entity.
///
/// Mentions with at most `max_seed_matches` matches contribute their entities to
/// the true nodes.
pub fn ground_seeds(scene: &Scene, mentions: &MentionSet, max_seed_matches: usize) -> SeedGrounding {
    let mut seeds = SeedGrounding::default();
    for mention in mentions.objects() {
        let matched: Vec<usize> = scene
            .entities()
            .iter()
            .filter(|e| mention.matches(e))
            .map(|e| e.index)
            .collect();

        tracing::debug!(mention = %mention, matches = matched.len(), "seed grounding");

        if matched.is_empty() {
            seeds.ungrounded.push(mention.id);
            continue;
        }
        if matched.len() <= max_seed_matches {
            seeds.true_nodes.extend(matched.iter().copied());
        }
        seeds.matches.insert(mention.id, matched);
    }
    seeds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mention::ObjectMention;
    use crate::scene::fixtures;

    fn mentions(objects: Vec<ObjectMention>) -> MentionSet {
        MentionSet::new(objects, vec![]).unwrap()
    }

    #[test]
    fn unique_descriptor_becomes_true_node() {
        let scene = fixtures::three_objects();
        let set = mentions(vec![ObjectMention::new(1, "cube", Some("red"))]);
        let seeds = ground_seeds(&scene, &set, 1);
        assert_eq!(seeds.matches_of(MentionId(1)), &[0]);
        assert!(seeds.true_nodes.contains(&0));
        assert!(seeds.is_confident(MentionId(1), 1));
    }

    #[test]
    fn color_only_mention_matches_on_color() {
        let scene = fixtures::three_objects();
        let set = mentions(vec![ObjectMention::new(1, "object", Some("green"))]);
        let seeds = ground_seeds(&scene, &set, 1);
        assert_eq!(seeds.matches_of(MentionId(1)), &[2]);
    }

    #[test]
    fn no_match_is_ungrounded() {
        let scene = fixtures::three_objects();
        let set = mentions(vec![
            ObjectMention::new(1, "cube", Some("purple")),
            ObjectMention::new(2, "object", None),
        ]);
        let seeds = ground_seeds(&scene, &set, 1);
        assert_eq!(seeds.ungrounded, vec![MentionId(1), MentionId(2)]);
        assert!(seeds.matches.is_empty());
        assert!(seeds.true_nodes.is_empty());
    }

    #[test]
    fn ambiguous_mention_seeds_without_true_nodes() {
        let scene = fixtures::scene(&[
            ("cube", "red", [0.0, 0.0, 0.0]),
            ("cube", "blue", [2.0, 0.0, 0.0]),
            ("sphere", "red", [0.0, 2.0, 0.0]),
        ]);
        let set = mentions(vec![ObjectMention::new(1, "cube", None)]);

        let seeds = ground_seeds(&scene, &set, 1);
        assert_eq!(seeds.matches_of(MentionId(1)), &[0, 1]);
        assert!(seeds.true_nodes.is_empty());
        assert!(!seeds.is_confident(MentionId(1), 1));

        let seeds = ground_seeds(&scene, &set, 2);
        assert_eq!(seeds.true_nodes.len(), 2);
    }
}
