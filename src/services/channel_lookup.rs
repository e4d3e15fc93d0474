use tracing::warn;

use crate::{
    dao::models::{ChannelId, GuildId, PuzzleData, PuzzleKey, RoundId},
    error::ServiceError,
    state::AppState,
};

/// Chat-platform channel as seen by the core: just enough surface to build
/// storage keys. Implemented by the out-of-scope command layer on top of its
/// platform SDK.
pub trait ChannelRef {
    /// Guild (tenant) the channel belongs to.
    fn guild_id(&self) -> GuildId;
    /// Numeric channel id.
    fn channel_id(&self) -> ChannelId;
    /// Channel display name.
    fn name(&self) -> &str;
    /// Mention string usable in messages.
    fn mention(&self) -> String;
    /// Parent category id, when the channel sits inside one.
    fn category_id(&self) -> Option<u64>;
    /// Parent category display name.
    fn category_name(&self) -> Option<&str>;
}

/// Category-name prefix marking a hunt's solved-puzzles archive.
pub fn solved_category_prefix(hunt_name: &str) -> String {
    format!("solved-{hunt_name}")
}

/// Look up the puzzle record behind `channel`, if any.
///
/// Channels outside a category, or inside a category no hunt claims, carry no
/// record. Channels sitting in the solved archive are looked up under
/// [`RoundId::Solved`]. An exact-key miss (stale round after the puzzle
/// moved) falls back to a round-agnostic search.
pub async fn puzzle_for_channel(
    state: &AppState,
    channel: &dyn ChannelRef,
) -> Result<Option<PuzzleData>, ServiceError> {
    let Some(category_id) = channel.category_id() else {
        return Ok(None);
    };

    let guild_id = channel.guild_id();
    let settings = state.settings().get_cached(guild_id).await?;
    let Some(hunt_id) = settings.category_mapping.get(&category_id) else {
        warn!(
            guild_id,
            category_id,
            channel = channel.name(),
            "channel category is not mapped to a hunt"
        );
        return Ok(None);
    };

    let hunt_name = settings
        .hunt_settings
        .get(hunt_id)
        .map(|hunt| hunt.hunt_name.as_str())
        .unwrap_or_default();
    let in_solved_archive = channel
        .category_name()
        .is_some_and(|name| name.starts_with(&solved_category_prefix(hunt_name)));
    let round_id = if in_solved_archive {
        RoundId::Solved
    } else {
        RoundId::Category(category_id)
    };

    let key = PuzzleKey {
        guild_id,
        channel_id: channel.channel_id(),
        round_id,
        hunt_id: hunt_id.clone(),
    };
    match state.puzzles().get(&key).await {
        Ok(puzzle) => Ok(Some(puzzle)),
        Err(ServiceError::MissingPuzzle(key)) => {
            warn!(%key, "exact puzzle lookup missed; trying round-agnostic search");
            state
                .puzzles()
                .find_by_channel(guild_id, channel.channel_id(), hunt_id)
                .await
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::hunt_store::memory::MemoryHuntStore;
    use crate::dao::models::{GuildSettings, HuntSettings};
    use crate::state::SharedState;
    use std::sync::Arc;

    struct StubChannel {
        guild_id: GuildId,
        channel_id: ChannelId,
        name: &'static str,
        category: Option<(u64, &'static str)>,
    }

    impl ChannelRef for StubChannel {
        fn guild_id(&self) -> GuildId {
            self.guild_id
        }
        fn channel_id(&self) -> ChannelId {
            self.channel_id
        }
        fn name(&self) -> &str {
            self.name
        }
        fn mention(&self) -> String {
            format!("<#{}>", self.channel_id)
        }
        fn category_id(&self) -> Option<u64> {
            self.category.map(|(id, _)| id)
        }
        fn category_name(&self) -> Option<&str> {
            self.category.map(|(_, name)| name)
        }
    }

    async fn seeded_state() -> SharedState {
        let store = Arc::new(MemoryHuntStore::new());
        let state = crate::state::AppState::new(store.clone(), store);

        let mut settings = GuildSettings::new(1);
        settings.hunt_settings.insert(
            "mh2026".to_string(),
            HuntSettings {
                hunt_name: "mystery-hunt".to_string(),
                ..HuntSettings::default()
            },
        );
        settings.category_mapping.insert(500, "mh2026".to_string());
        settings.category_mapping.insert(900, "mh2026".to_string());
        state.settings().commit(settings).await.unwrap();

        let mut puzzle = PuzzleData::new("tollbooth", "mystery-hunt", "emotions");
        puzzle.guild_id = 1;
        puzzle.channel_id = 700;
        puzzle.round_id = RoundId::Category(500);
        puzzle.hunt_id = "mh2026".to_string();
        state.puzzles().commit(puzzle).await.unwrap();

        state
    }

    #[tokio::test]
    async fn resolves_puzzle_through_its_category() {
        let state = seeded_state().await;
        let channel = StubChannel {
            guild_id: 1,
            channel_id: 700,
            name: "tollbooth",
            category: Some((500, "emotions")),
        };

        let found = puzzle_for_channel(&state, &channel).await.unwrap();
        assert_eq!(found.unwrap().name, "tollbooth");
    }

    #[tokio::test]
    async fn channel_without_category_has_no_puzzle() {
        let state = seeded_state().await;
        let channel = StubChannel {
            guild_id: 1,
            channel_id: 700,
            name: "general",
            category: None,
        };

        assert!(puzzle_for_channel(&state, &channel).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unmapped_category_has_no_puzzle() {
        let state = seeded_state().await;
        let channel = StubChannel {
            guild_id: 1,
            channel_id: 700,
            name: "tollbooth",
            category: Some((123, "off-topic")),
        };

        assert!(puzzle_for_channel(&state, &channel).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn solved_archive_channel_resolves_under_wildcard_round() {
        let state = seeded_state().await;

        let mut solved = PuzzleData::new("finished", "mystery-hunt", "emotions");
        solved.guild_id = 1;
        solved.channel_id = 701;
        solved.round_id = RoundId::Solved;
        solved.hunt_id = "mh2026".to_string();
        state.puzzles().commit(solved).await.unwrap();

        let channel = StubChannel {
            guild_id: 1,
            channel_id: 701,
            name: "finished",
            category: Some((900, "solved-mystery-hunt")),
        };

        let found = puzzle_for_channel(&state, &channel).await.unwrap();
        assert_eq!(found.unwrap().round_id, RoundId::Solved);
    }

    #[tokio::test]
    async fn stale_round_falls_back_to_relaxed_search() {
        let state = seeded_state().await;

        // the puzzle moved to the solved bucket, but the channel still sits
        // in its original category
        let mut moved = state
            .puzzles()
            .get(&PuzzleKey {
                guild_id: 1,
                channel_id: 700,
                round_id: RoundId::Category(500),
                hunt_id: "mh2026".to_string(),
            })
            .await
            .unwrap();
        state.puzzles().delete(&moved.key()).await.unwrap();
        moved.round_id = RoundId::Solved;
        state.puzzles().commit(moved).await.unwrap();

        let channel = StubChannel {
            guild_id: 1,
            channel_id: 700,
            name: "tollbooth",
            category: Some((500, "emotions")),
        };

        let found = puzzle_for_channel(&state, &channel).await.unwrap();
        assert_eq!(found.unwrap().round_id, RoundId::Solved);
    }
}
