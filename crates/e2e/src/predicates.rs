//! Business predicates over returned records
//!
//! Each predicate returns the list of violations it found, one string per
//! offending record, so callers can attach them as evidence verbatim.

use kinocheck_common::MovieRecord;

/// Genre names accepted as "animation"
pub const ANIMATION_KEYWORDS: [&str; 3] = ["мультфильм", "анимация", "animation"];

/// The result set must not be empty
pub fn non_empty(records: &[MovieRecord]) -> Vec<String> {
    if records.is_empty() {
        vec!["no records returned".to_string()]
    } else {
        Vec::new()
    }
}

/// At least one record's name contains the query, case-insensitively
pub fn search_match(records: &[MovieRecord], query: &str) -> Vec<String> {
    let needle = query.trim().to_lowercase();
    if records.iter().any(|r| r.name.to_lowercase().contains(&needle)) {
        Vec::new()
    } else {
        vec![format!(
            "none of {} records has a name containing '{}'",
            records.len(),
            query
        )]
    }
}

/// Outcome of the age-rating filter check
#[derive(Debug, Default)]
pub struct AgeRatingReport {
    pub violations: Vec<String>,

    /// Records whose rating could not be read as an integer
    pub skipped: Vec<String>,
}

/// Every coercible age rating is at least `min_age`.
///
/// Ratings that cannot be coerced are skipped and reported separately rather
/// than counted as violations.
pub fn age_rating_at_least(records: &[MovieRecord], min_age: i64) -> AgeRatingReport {
    let mut report = AgeRatingReport::default();

    for (i, record) in records.iter().enumerate() {
        match record.age_rating.as_ref().and_then(|r| r.coerce()) {
            Some(age) if age < min_age => report.violations.push(format!(
                "record #{} {}: age rating {} < {}",
                i,
                record.label(),
                age,
                min_age
            )),
            Some(_) => {}
            None => report.skipped.push(format!(
                "record #{} {}: age rating {} is not an integer",
                i,
                record.label(),
                record
                    .age_rating
                    .as_ref()
                    .map(|r| format!("'{}'", r))
                    .unwrap_or_else(|| "null".to_string())
            )),
        }
    }

    report
}

/// Every record's year equals `year` exactly
pub fn year_equals(records: &[MovieRecord], year: i64) -> Vec<String> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.year != Some(year))
        .map(|(i, r)| {
            let actual = r.year.map_or_else(|| "missing".to_string(), |y| y.to_string());
            format!("record #{} {}: year {} != {}", i, r.label(), actual, year)
        })
        .collect()
}

/// Every record has a genre name containing one of `keywords`
pub fn genre_matches_any(records: &[MovieRecord], keywords: &[String]) -> Vec<String> {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    records
        .iter()
        .enumerate()
        .filter(|(_, r)| {
            !r.genre_names()
                .iter()
                .any(|name| keywords.iter().any(|k| name.contains(k)))
        })
        .map(|(i, r)| {
            format!(
                "record #{} {}: genres [{}] match none of [{}]",
                i,
                r.label(),
                r.genre_names().join(", "),
                keywords.join(", ")
            )
        })
        .collect()
}

/// One evidence line per record
pub fn describe(record: &MovieRecord) -> String {
    let year = record.year.map_or_else(|| "н/д".to_string(), |y| y.to_string());
    let age = record
        .age_rating
        .as_ref()
        .map_or_else(|| "н/д".to_string(), |a| format!("{}+", a.to_string().trim_end_matches('+')));
    let kp = record
        .rating
        .as_ref()
        .and_then(|r| r.kp)
        .map_or_else(|| "н/д".to_string(), |kp| format!("{:.1}", kp));

    format!(
        "{} ({}) | возраст {} | жанры: {} | kp {}",
        if record.name.is_empty() { "Без названия" } else { record.name.as_str() },
        year,
        age,
        record.genre_names().join(", "),
        kp
    )
}
