use reelmatch_model::MovieEntity;

/// Folds `incoming` into `survivor` and returns how many sources were added.
///
/// The survivor's sources come first and win on `(type, sourceId)`
/// conflicts. Descriptive fields (title, year, metadata, AI hint) are only
/// taken from `incoming` where the survivor has none; `verified` sticks once
/// either side was verified.
pub fn fold_into(survivor: &mut MovieEntity, incoming: MovieEntity) -> usize {
    let MovieEntity {
        title,
        year,
        sources,
        metadata,
        ai_hint,
        verified,
        ..
    } = incoming;

    let added = sources
        .into_iter()
        .filter(|source| survivor.add_source(source.clone()))
        .count();

    if survivor.display_title().is_none() {
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            survivor.title = Some(title);
        }
    }
    if survivor.year.is_none() {
        survivor.year = year;
    }
    if survivor.metadata.is_none() {
        survivor.metadata = metadata;
    }
    if survivor.ai_hint.is_none() {
        survivor.ai_hint = ai_hint;
    }
    survivor.verified |= verified;
    survivor.touch();

    added
}

/// Drops repeated `(type, sourceId)` entries, keeping the first occurrence.
pub fn dedupe_sources(entity: &mut MovieEntity) -> usize {
    let before = entity.sources.len();
    let sources = std::mem::take(&mut entity.sources);
    for source in sources {
        entity.add_source(source);
    }
    before - entity.sources.len()
}
