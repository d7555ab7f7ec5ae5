use compendium_core::config::ResolverSettings;
use compendium_core::{Error, GameQuery, GameRecord, Result};
use compendium_text::tantivy_utils::{DEV_COMPANIES, NAME, RELEASE_DATE};

const SECONDS_PER_DAY: i64 = 24 * 3600;

/// Query matching committed games that look like `record`.
///
/// The name decides the match: an exact phrase scores a constant large enough
/// to dominate, otherwise every word of the name must appear. Release date
/// within the window and the full developer list only add score on top.
pub fn similarity_query(record: &GameRecord, settings: &ResolverSettings) -> Result<GameQuery> {
    let name = record.name.trim();
    if name.is_empty() {
        return Err(Error::Query(format!("record '{}' has no name", record.id)));
    }
    let mut query = GameQuery::Or(vec![
        GameQuery::phrase(NAME, name).const_score(settings.name_phrase_score),
        GameQuery::all_words(NAME, name),
    ]);

    if let Some(released) = record.release_date {
        let window = settings.release_window_days.saturating_mul(SECONDS_PER_DAY);
        let range = GameQuery::date_range(RELEASE_DATE, released.saturating_sub(window), released.saturating_add(window));
        query = query.and_maybe(range.const_score(settings.release_boost));
    }

    let developers: Vec<GameQuery> = record.dev_companies.iter().map(|d| GameQuery::term(DEV_COMPANIES, d)).collect();
    if !developers.is_empty() {
        query = query.and_maybe(GameQuery::And(developers).boost(settings.developer_boost));
    }

    Ok(query.normalize())
}
