//! Invariant checks run before a record is persisted.

use time::OffsetDateTime;
use validator::{ValidationError, ValidationErrors};

use crate::dao::models::{GuildSettings, PuzzleData};

/// Validates that a hunt id is a non-empty slug of lowercase alphanumerics,
/// dashes, and underscores. Hunt ids become part of storage document ids, so
/// separators and the `*` wildcard are rejected.
pub fn validate_hunt_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        let mut err = ValidationError::new("hunt_id_empty");
        err.message = Some("Hunt id must not be empty".into());
        return Err(err);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        let mut err = ValidationError::new("hunt_id_format");
        err.message = Some(
            format!("Hunt id `{id}` must contain only lowercase alphanumerics, `-`, or `_`").into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that `end`, when present, does not precede `start`.
pub fn validate_time_order(
    code: &'static str,
    start: Option<OffsetDateTime>,
    end: Option<OffsetDateTime>,
) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (start, end)
        && end < start
    {
        let mut err = ValidationError::new(code);
        err.message = Some(format!("{end} precedes {start}").into());
        return Err(err);
    }
    Ok(())
}

/// Validate a full settings record: hunt id shapes, hunt time ordering, and
/// the category mapping only referencing hunts that exist.
pub fn validate_guild_settings(settings: &GuildSettings) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    for (hunt_id, hunt) in &settings.hunt_settings {
        if let Err(err) = validate_hunt_id(hunt_id) {
            errors.add("hunt_settings".into(), err);
        }
        if let Err(err) = validate_time_order("end_before_start", hunt.start_time, hunt.end_time) {
            errors.add("hunt_settings".into(), err);
        }
    }

    for (category_id, hunt_id) in &settings.category_mapping {
        if !settings.hunt_settings.contains_key(hunt_id) {
            let mut err = ValidationError::new("category_unknown_hunt");
            err.message =
                Some(format!("Category {category_id} maps to unknown hunt `{hunt_id}`").into());
            errors.add("category_mapping".into(), err);
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Validate a puzzle record before it is persisted.
pub fn validate_puzzle(puzzle: &PuzzleData) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if let Err(err) = validate_hunt_id(&puzzle.hunt_id) {
        errors.add("hunt_id".into(), err);
    }
    if let Err(err) = validate_time_order("solve_before_start", puzzle.start_time, puzzle.solve_time)
    {
        errors.add("solve_time".into(), err);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
