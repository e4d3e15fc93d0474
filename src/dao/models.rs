use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use time::OffsetDateTime;

/// Chat-platform snowflake identifying a guild (tenant).
pub type GuildId = u64;
/// Chat-platform snowflake identifying a channel.
pub type ChannelId = u64;

/// Hunt filter accepted by bulk queries: matches every hunt.
pub const ALL_HUNTS: &str = "*";
/// Wire form of the solved-puzzles archive round.
pub const SOLVED_ROUND: &str = "*";

/// Per-guild bot configuration, keyed by [`GuildSettings::guild_id`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuildSettings {
    /// Snowflake of the guild these settings belong to.
    pub guild_id: GuildId,
    /// Display name of the guild.
    #[serde(default)]
    pub guild_name: String,
    /// Channel the bot listens on for commands; empty means every channel.
    #[serde(default)]
    pub discord_bot_channel: String,
    /// Short emoji/label prefixed to bot messages.
    #[serde(default = "default_bot_emoji")]
    pub discord_bot_emoji: String,
    /// Whether puzzle channels get a companion voice channel.
    #[serde(default = "default_true")]
    pub discord_use_voice_channels: bool,
    /// Root storage folder holding all hunt material.
    #[serde(default)]
    pub drive_parent_id: String,
    /// Document collecting resource links for the team.
    #[serde(default)]
    pub drive_resources_id: String,
    /// Template spreadsheet copied when a puzzle sheet is created.
    #[serde(default)]
    pub drive_starter_sheet_id: String,
    /// Category collecting the channels of past hunts.
    #[serde(default)]
    pub archive_category_id: Option<u64>,
    /// Per-hunt configuration keyed by hunt id.
    #[serde(default)]
    pub hunt_settings: IndexMap<String, HuntSettings>,
    /// Maps a chat category to the hunt its channels belong to.
    ///
    /// Every value must name a key of `hunt_settings`; commits enforce this.
    #[serde(default)]
    pub category_mapping: IndexMap<u64, String>,
}

impl GuildSettings {
    /// Fresh settings for a guild that has none stored yet.
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            guild_name: String::new(),
            discord_bot_channel: String::new(),
            discord_bot_emoji: default_bot_emoji(),
            discord_use_voice_channels: true,
            drive_parent_id: String::new(),
            drive_resources_id: String::new(),
            drive_starter_sheet_id: String::new(),
            archive_category_id: None,
            hunt_settings: IndexMap::new(),
            category_mapping: IndexMap::new(),
        }
    }
}

fn default_bot_emoji() -> String {
    ":ladder: :dog:".to_string()
}

fn default_true() -> bool {
    true
}

/// Per-event configuration, identified by `(guild_id, hunt_id)` and stored
/// as a value of [`GuildSettings::hunt_settings`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HuntSettings {
    /// Display name of the hunt.
    #[serde(default)]
    pub hunt_name: String,
    /// Home page of the hunt site.
    #[serde(default)]
    pub hunt_url: String,
    /// Separator in puzzle page urls, e.g. `-` for `https://./puzzle/foo-bar`.
    #[serde(default = "default_url_sep")]
    pub hunt_url_sep: String,
    /// Nexus dashboard spreadsheet; empty disables the periodic refresh.
    #[serde(default)]
    pub drive_nexus_sheet_id: String,
    /// Storage folder holding this hunt's material.
    #[serde(default)]
    pub drive_parent_id: String,
    /// Role granted to participants of this hunt.
    #[serde(default)]
    pub role_id: Option<u64>,
    /// When the hunt opened.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
    /// When the hunt closed; unset while the hunt is running.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
}

impl Default for HuntSettings {
    fn default() -> Self {
        Self {
            hunt_name: String::new(),
            hunt_url: String::new(),
            hunt_url_sep: default_url_sep(),
            drive_nexus_sheet_id: String::new(),
            drive_parent_id: String::new(),
            role_id: None,
            start_time: None,
            end_time: None,
        }
    }
}

impl HuntSettings {
    /// A hunt with no recorded end is still running.
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }
}

fn default_url_sep() -> String {
    "-".to_string()
}

/// Round a puzzle channel belongs to: the category hosting the round, or the
/// shared archive bucket for solved puzzles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundId {
    /// Category channel hosting the round.
    Category(u64),
    /// Wildcard bucket for solved puzzles, distinct from the original round.
    Solved,
}

impl Default for RoundId {
    fn default() -> Self {
        RoundId::Category(0)
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundId::Category(id) => write!(f, "{id}"),
            RoundId::Solved => f.write_str(SOLVED_ROUND),
        }
    }
}

/// Error returned when a string is neither a category id nor `"*"`.
#[derive(Debug, Error)]
#[error("invalid round id `{value}`")]
pub struct ParseRoundIdError {
    value: String,
}

impl FromStr for RoundId {
    type Err = ParseRoundIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == SOLVED_ROUND {
            return Ok(RoundId::Solved);
        }
        s.parse().map(RoundId::Category).map_err(|_| ParseRoundIdError {
            value: s.to_string(),
        })
    }
}

// Stored records carry the category id as a number and the archive bucket as
// the literal string "*", so (de)serialization is spelled out by hand.
impl Serialize for RoundId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RoundId::Category(id) => serializer.serialize_u64(*id),
            RoundId::Solved => serializer.serialize_str(SOLVED_ROUND),
        }
    }
}

impl<'de> Deserialize<'de> for RoundId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RoundIdVisitor;

        impl Visitor<'_> for RoundIdVisitor {
            type Value = RoundId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a category id or \"*\"")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<RoundId, E> {
                Ok(RoundId::Category(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<RoundId, E> {
                u64::try_from(value)
                    .map(RoundId::Category)
                    .map_err(|_| E::custom(format!("negative round id {value}")))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<RoundId, E> {
                value.parse().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(RoundIdVisitor)
    }
}

/// Composite key identifying one puzzle record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PuzzleKey {
    /// Guild the puzzle belongs to.
    pub guild_id: GuildId,
    /// Channel provisioned for the puzzle.
    pub channel_id: ChannelId,
    /// Round bucket the record is filed under.
    pub round_id: RoundId,
    /// Hunt the puzzle is part of.
    pub hunt_id: String,
}

impl fmt::Display for PuzzleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "guild {} hunt {} round {} channel {}",
            self.guild_id, self.hunt_id, self.round_id, self.channel_id
        )
    }
}

/// One puzzle instance, created when its channel is provisioned and mutated
/// throughout the event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PuzzleData {
    /// Puzzle name, matching the channel name.
    pub name: String,
    /// Display name of the hunt.
    #[serde(default)]
    pub hunt_name: String,
    /// Display name of the round (category).
    #[serde(default)]
    pub round_name: String,
    /// Round bucket the record is filed under.
    #[serde(default)]
    pub round_id: RoundId,
    /// Guild the puzzle belongs to.
    #[serde(default)]
    pub guild_id: GuildId,
    /// Display name of the guild.
    #[serde(default)]
    pub guild_name: String,
    /// Channel provisioned for the puzzle.
    #[serde(default)]
    pub channel_id: ChannelId,
    /// Mention string for the puzzle channel.
    #[serde(default)]
    pub channel_mention: String,
    /// Hunt the puzzle is part of.
    #[serde(default)]
    pub hunt_id: String,
    /// Companion voice channel, when the guild uses them.
    #[serde(default)]
    pub voice_channel_id: Option<u64>,
    /// Mention of the archive channel once the puzzle moved there.
    #[serde(default)]
    pub archive_channel_mention: String,
    /// Puzzle page on the hunt site.
    #[serde(default)]
    pub hunt_url: String,
    /// Working spreadsheet for this puzzle.
    #[serde(default)]
    pub google_sheet_id: String,
    /// Storage folder the spreadsheet lives in.
    #[serde(default)]
    pub google_folder_id: String,
    /// Free-text working status.
    #[serde(default)]
    pub status: String,
    /// Confirmed solution; non-empty means solved.
    #[serde(default)]
    pub solution: String,
    /// Free-text priority label.
    #[serde(default)]
    pub priority: String,
    /// Free-text puzzle type label.
    #[serde(default)]
    pub puzzle_type: String,
    /// Ordered notes left by solvers.
    #[serde(default)]
    pub notes: Vec<String>,
    /// When the puzzle channel was provisioned.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
    /// When the solution was confirmed.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub solve_time: Option<OffsetDateTime>,
    /// When the puzzle was moved to the archive round.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub archive_time: Option<OffsetDateTime>,
}

impl PuzzleData {
    /// Record for a freshly provisioned puzzle channel.
    pub fn new(
        name: impl Into<String>,
        hunt_name: impl Into<String>,
        round_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            hunt_name: hunt_name.into(),
            round_name: round_name.into(),
            ..Self::default()
        }
    }

    /// Composite key this record is stored under.
    pub fn key(&self) -> PuzzleKey {
        PuzzleKey {
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            round_id: self.round_id,
            hunt_id: self.hunt_id.clone(),
        }
    }

    /// A recorded solution counts as solved whatever the status text says.
    pub fn is_solved(&self) -> bool {
        !self.solution.is_empty()
    }

    /// Metas are named exactly `meta` (channel names are lowercase).
    pub fn is_meta(&self) -> bool {
        self.name == "meta"
    }

    /// Sort puzzles so all puzzles of a round sit together, rounds ordered by
    /// the earliest `start_time` among their puzzles and puzzles within a
    /// round by their own `start_time`.
    ///
    /// Missing start times fall back to the Unix epoch on both sort keys, so
    /// rounds with no timed puzzle sort first; callers that want them last
    /// must pre-filter.
    pub fn sort_by_round_start(mut puzzles: Vec<PuzzleData>) -> Vec<PuzzleData> {
        let mut round_starts: HashMap<String, OffsetDateTime> = HashMap::new();
        for puzzle in &puzzles {
            let Some(start) = puzzle.start_time else {
                continue;
            };
            round_starts
                .entry(puzzle.round_name.clone())
                .and_modify(|earliest| {
                    if start < *earliest {
                        *earliest = start;
                    }
                })
                .or_insert(start);
        }

        puzzles.sort_by_key(|puzzle| {
            let round_start = round_starts
                .get(&puzzle.round_name)
                .copied()
                .unwrap_or(OffsetDateTime::UNIX_EPOCH);
            let own_start = puzzle.start_time.unwrap_or(OffsetDateTime::UNIX_EPOCH);
            (round_start, own_start)
        });
        puzzles
    }
}
