use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::providers::SearchCandidate;

/// Qualitative match certainty used to gate automatic acceptance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    None,
    Low,
    Medium,
    High,
}

impl Confidence {
    /// `medium` and `high` are auto-accepted; `low` is treated as no match.
    pub fn is_acceptable(&self) -> bool {
        *self >= Confidence::Medium
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::None => "none",
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        };
        f.write_str(label)
    }
}

/// Similarity cut-offs for the confidence tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchThresholds {
    /// Similarity at or above which a title counts as strongly matching.
    pub strict_similarity: f64,
    /// Similarity at or above which a title is related; marks `low`.
    pub similarity_floor: f64,
    /// Year distance that still counts as near; marks `low`.
    pub year_tolerance: u16,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            strict_similarity: 0.90,
            similarity_floor: 0.60,
            year_tolerance: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate<'a> {
    pub candidate: &'a SearchCandidate,
    pub position: usize,
    pub similarity: f64,
    pub year_exact: bool,
    pub confidence: Confidence,
}

impl ScoredCandidate<'_> {
    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.confidence
            .cmp(&other.confidence)
            .then(self.year_exact.cmp(&other.year_exact))
            .then(self.similarity.total_cmp(&other.similarity))
    }
}

/// Lowercased alphanumeric words; punctuation acts as a word break.
pub fn comparable_title(title: &str) -> String {
    let spaced: String = title
        .replace('&', " and ")
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else if c == '\'' || c == '’' {
                '\0'
            } else {
                ' '
            }
        })
        .filter(|c| *c != '\0')
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case- and punctuation-insensitive similarity in `0.0..=1.0`.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a = comparable_title(a);
    let b = comparable_title(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(&a, &b)
}

pub fn score_candidate<'a>(
    name: &str,
    year_hint: Option<u16>,
    candidate: &'a SearchCandidate,
    position: usize,
    thresholds: &MatchThresholds,
) -> ScoredCandidate<'a> {
    let similarity = title_similarity(name, &candidate.title);
    let year_exact = year_hint.is_some() && candidate.year == year_hint;
    let year_near = match (year_hint, candidate.year) {
        (Some(hint), Some(year)) => hint.abs_diff(year) <= thresholds.year_tolerance,
        _ => false,
    };
    let strong_title = similarity >= thresholds.strict_similarity;
    let related_title = similarity >= thresholds.similarity_floor;

    // Exact year and strong title are the two strong criteria; the floor
    // and tolerance only separate marginal candidates from unrelated ones.
    let confidence = match (year_exact, strong_title) {
        (true, true) => Confidence::High,
        (true, false) | (false, true) => Confidence::Medium,
        (false, false) if related_title || year_near => Confidence::Low,
        (false, false) => Confidence::None,
    };

    ScoredCandidate {
        candidate,
        position,
        similarity,
        year_exact,
        confidence,
    }
}

/// Best candidate by tier, then exact year, then similarity; the provider's
/// own order breaks remaining ties (first-returned wins).
pub fn pick_best<'a>(
    name: &str,
    year_hint: Option<u16>,
    candidates: &'a [SearchCandidate],
    thresholds: &MatchThresholds,
) -> Option<ScoredCandidate<'a>> {
    let mut best: Option<ScoredCandidate<'a>> = None;
    for (position, candidate) in candidates.iter().enumerate() {
        let scored =
            score_candidate(name, year_hint, candidate, position, thresholds);
        let replace = match &best {
            None => true,
            Some(current) => scored.rank_cmp(current) == Ordering::Greater,
        };
        if replace {
            best = Some(scored);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, title: &str, year: Option<u16>) -> SearchCandidate {
        SearchCandidate::new(id, title, year)
    }

    #[test]
    fn similarity_ignores_case_and_punctuation() {
        assert_eq!(title_similarity("THE MATRIX", "The Matrix"), 1.0);
        assert_eq!(title_similarity("Dr. Strangelove", "Dr Strangelove"), 1.0);
        assert_eq!(title_similarity("Angels & Demons", "Angels and Demons"), 1.0);
        assert_eq!(title_similarity("It's a Wonderful Life", "Its a Wonderful Life"), 1.0);
        assert!(title_similarity("The Matrix", "The Matrix Reloaded") < 0.9);
        assert_eq!(title_similarity("", "The Matrix"), 0.0);
    }

    #[test]
    fn exact_year_and_title_is_high() {
        let results = [candidate("tt0133093", "The Matrix", Some(1999))];
        let best = pick_best("The Matrix", Some(1999), &results, &MatchThresholds::default())
            .unwrap();
        assert_eq!(best.confidence, Confidence::High);
        assert_eq!(best.candidate.external_id, "tt0133093");
    }

    #[test]
    fn exact_year_outranks_provider_order() {
        let results = [
            candidate("tt0099334", "Cyrano de Bergerac", Some(1990)),
            candidate("tt0042367", "Cyrano de Bergerac", Some(1950)),
        ];
        let best = pick_best(
            "Cyrano de Bergerac",
            Some(1950),
            &results,
            &MatchThresholds::default(),
        )
        .unwrap();
        assert_eq!(best.candidate.external_id, "tt0042367");
        assert_eq!(best.position, 1);
    }

    #[test]
    fn first_returned_wins_ties() {
        let results = [
            candidate("tt0000001", "Detour", Some(1945)),
            candidate("tt0000002", "Detour", Some(1945)),
        ];
        let best =
            pick_best("Detour", Some(1945), &results, &MatchThresholds::default())
                .unwrap();
        assert_eq!(best.candidate.external_id, "tt0000001");
    }

    #[test]
    fn tiers_follow_thresholds() {
        let thresholds = MatchThresholds::default();
        let exact = candidate("tt1", "His Girl Friday", Some(1940));

        let no_hint = score_candidate("His Girl Friday", None, &exact, 0, &thresholds);
        assert_eq!(no_hint.confidence, Confidence::Medium);

        let off_by_one =
            score_candidate("His Girl Friday", Some(1941), &exact, 0, &thresholds);
        assert_eq!(off_by_one.confidence, Confidence::Medium);

        let unrelated =
            score_candidate("Plan 9 from Outer Space", Some(1970), &exact, 0, &thresholds);
        assert_eq!(unrelated.confidence, Confidence::None);

        let near_year =
            score_candidate("Plan 9 from Outer Space", Some(1941), &exact, 0, &thresholds);
        assert_eq!(near_year.confidence, Confidence::Low);

        let related = score_candidate("Her Girl Friday", Some(1970), &exact, 0, &thresholds);
        assert!(related.similarity >= thresholds.similarity_floor);
        assert_eq!(related.confidence, Confidence::Low);
    }

    #[test]
    fn one_strong_criterion_is_medium() {
        let thresholds = MatchThresholds::default();
        let remake = candidate("tt0099334", "Cyrano de Bergerac", Some(1990));
        let title_only =
            score_candidate("Cyrano de Bergerac", Some(1950), &remake, 0, &thresholds);
        assert_eq!(title_only.similarity, 1.0);
        assert!(!title_only.year_exact);
        assert_eq!(title_only.confidence, Confidence::Medium);

        let exact = candidate("tt1", "His Girl Friday", Some(1940));
        let year_only =
            score_candidate("Plan 9 from Outer Space", Some(1940), &exact, 0, &thresholds);
        assert!(year_only.similarity < thresholds.similarity_floor);
        assert_eq!(year_only.confidence, Confidence::Medium);
    }

    #[test]
    fn low_is_not_acceptable() {
        assert!(!Confidence::None.is_acceptable());
        assert!(!Confidence::Low.is_acceptable());
        assert!(Confidence::Medium.is_acceptable());
        assert!(Confidence::High.is_acceptable());
    }
}
