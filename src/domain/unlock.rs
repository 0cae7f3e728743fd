use super::entities::{CollectionLevels, RecipeDefinition};

/// Whether the player can craft the recipe's output.
///
/// An empty mapping means the player has not been verified yet; every recipe
/// counts as unlocked until then.
pub fn is_unlocked(recipe: &RecipeDefinition, collection_levels: &CollectionLevels) -> bool {
    if collection_levels.is_empty() {
        return true;
    }
    let level = collection_levels
        .get(&recipe.unlock_collection_key)
        .copied()
        .unwrap_or(0);
    level >= recipe.unlock_collection_level
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(key: &str, level: u32) -> RecipeDefinition {
        RecipeDefinition {
            id: "A".into(),
            name: "A".into(),
            raw_id: "R".into(),
            stage1_output_id: "S1".into(),
            stage2_output_id: None,
            stage1_ratio: 10,
            stage2_ratio: None,
            npc_floor_price1: None,
            npc_floor_price2: None,
            unlock_collection_key: key.into(),
            unlock_collection_level: level,
        }
    }

    #[test]
    fn unverified_player_sees_everything_unlocked() {
        assert!(is_unlocked(&recipe("WHEAT", 9), &CollectionLevels::new()));
    }

    #[test]
    fn compares_against_required_level() {
        let levels: CollectionLevels = [("WHEAT".to_string(), 5)].into_iter().collect();
        assert!(is_unlocked(&recipe("WHEAT", 5), &levels));
        assert!(is_unlocked(&recipe("WHEAT", 2), &levels));
        assert!(!is_unlocked(&recipe("WHEAT", 7), &levels));
    }

    #[test]
    fn unknown_collection_counts_as_level_zero() {
        let levels: CollectionLevels = [("WHEAT".to_string(), 5)].into_iter().collect();
        assert!(!is_unlocked(&recipe("CARROT", 1), &levels));
        assert!(is_unlocked(&recipe("CARROT", 0), &levels));
    }
}
