use crate::dao::models::{GuildId, PuzzleKey};

use super::error::JsonDaoError;

/// File name prefix for guild settings documents.
pub const SETTINGS_PREFIX: &str = "settings::";
/// File name prefix for puzzle documents.
pub const PUZZLE_PREFIX: &str = "puzzle::";
/// Extension shared by every record file.
pub const RECORD_EXT: &str = "json";

/// Document id of a guild's settings record.
pub fn settings_doc_id(guild_id: GuildId) -> String {
    format!("{SETTINGS_PREFIX}{guild_id}")
}

/// Document id of a puzzle record: `puzzle::<guild>:<hunt>:<round>:<channel>`.
///
/// Hunt ids are validated to contain no `:` before they reach storage, so the
/// segments stay unambiguous.
pub fn puzzle_doc_id(key: &PuzzleKey) -> String {
    format!(
        "{PUZZLE_PREFIX}{}:{}:{}:{}",
        key.guild_id, key.hunt_id, key.round_id, key.channel_id
    )
}

/// Parse a guild id back out of a settings document id.
pub fn parse_settings_doc_id(doc_id: &str) -> Result<GuildId, JsonDaoError> {
    let raw = doc_id
        .strip_prefix(SETTINGS_PREFIX)
        .ok_or_else(|| invalid(doc_id, "missing settings prefix"))?;
    raw.parse().map_err(|_| invalid(doc_id, "invalid guild id"))
}

/// Parse a composite puzzle key back out of a puzzle document id.
pub fn parse_puzzle_doc_id(doc_id: &str) -> Result<PuzzleKey, JsonDaoError> {
    let raw = doc_id
        .strip_prefix(PUZZLE_PREFIX)
        .ok_or_else(|| invalid(doc_id, "missing puzzle prefix"))?;

    let segments: Vec<&str> = raw.split(':').collect();
    let [guild, hunt, round, channel] = segments[..] else {
        return Err(invalid(doc_id, "wrong segment count"));
    };

    Ok(PuzzleKey {
        guild_id: guild.parse().map_err(|_| invalid(doc_id, "invalid guild id"))?,
        channel_id: channel
            .parse()
            .map_err(|_| invalid(doc_id, "invalid channel id"))?,
        round_id: round.parse().map_err(|_| invalid(doc_id, "invalid round id"))?,
        hunt_id: hunt.to_string(),
    })
}

fn invalid(doc_id: &str, kind: &'static str) -> JsonDaoError {
    JsonDaoError::InvalidDocId {
        doc_id: doc_id.to_string(),
        kind,
    }
}
