//! Merging, deduplication, rating, and ordering of multi-source movie records.
//!
//! Everything in this module is a pure function of its inputs. The
//! orchestration layers call into it after collecting provider results.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use feruca::Collator;
use moviehub_common::{AggregatedRating, Error, Movie, Rating, Result, SortMode};
use regex::Regex;
use tracing::warn;

/// Weight applied to sources not listed in [`SOURCE_WEIGHTS`].
const DEFAULT_WEIGHT: f64 = 0.1;

const SOURCE_WEIGHTS: &[(&str, f64)] = &[
    ("imdb", 0.4),
    ("tmdb", 0.3),
    ("rotten_tomatoes", 0.2),
    ("metacritic", 0.1),
];

/// A 19xx/20xx year delimited by ASCII non-word characters, so a year
/// written flush against CJK text still counts.
static YEAR_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_])((?:19|20)[0-9]{2})(?:[^A-Za-z0-9_]|$)")
        .expect("year pattern is valid")
});

fn source_weight(source: &str) -> f64 {
    SOURCE_WEIGHTS
        .iter()
        .find(|(name, _)| *name == source)
        .map(|(_, w)| *w)
        .unwrap_or(DEFAULT_WEIGHT)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn fill_text(target: &mut Option<String>, candidate: &Option<String>) {
    if is_blank(target) && !is_blank(candidate) {
        *target = candidate.clone();
    }
}

fn union_into(target: &mut Vec<String>, seen: &mut HashSet<String>, values: &[String]) {
    for value in values {
        if seen.insert(value.clone()) {
            target.push(value.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Merge several records describing the same title into one.
///
/// The first record is the base. Optional scalar fields take the first
/// non-empty value in sequence order, external ids take the last non-empty
/// value per key, list fields are unioned in first-seen order, and ratings
/// are deduplicated per source preferring the higher vote count.
pub fn merge_movies(movies: &[Movie]) -> Result<Movie> {
    let (first, rest) = movies
        .split_first()
        .ok_or_else(|| Error::EmptyInput("cannot merge an empty list of movies".into()))?;

    if rest.is_empty() {
        return Ok(first.clone());
    }

    let mut merged = first.clone();
    merged.genres.clear();
    merged.directors.clear();
    merged.cast.clear();
    merged.external_ids = Default::default();

    let mut ratings: Vec<Rating> = Vec::new();
    let mut sources: Vec<String> = Vec::new();
    let mut seen_sources = HashSet::new();
    let mut seen_genres = HashSet::new();
    let mut seen_directors = HashSet::new();
    let mut seen_cast = HashSet::new();

    for movie in movies {
        ratings.extend(movie.ratings.iter().cloned());
        union_into(&mut sources, &mut seen_sources, &movie.sources);
        merged.external_ids.overlay(&movie.external_ids);

        fill_text(&mut merged.plot, &movie.plot);
        fill_text(&mut merged.poster, &movie.poster);
        fill_text(&mut merged.backdrop, &movie.backdrop);
        fill_text(&mut merged.release_date, &movie.release_date);
        if merged.runtime.unwrap_or(0) == 0 && movie.runtime.unwrap_or(0) > 0 {
            merged.runtime = movie.runtime;
        }

        union_into(&mut merged.genres, &mut seen_genres, &movie.genres);
        union_into(&mut merged.directors, &mut seen_directors, &movie.directors);
        union_into(&mut merged.cast, &mut seen_cast, &movie.cast);
    }

    merged.ratings = dedupe_ratings(ratings);
    merged.sources = sources;
    Ok(merged)
}

/// Keep one rating per source: the one with more votes, where any vote
/// count beats a missing one and ties keep the earlier rating.
fn dedupe_ratings(ratings: Vec<Rating>) -> Vec<Rating> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Rating> = Vec::new();

    for rating in ratings {
        match index.get(&rating.source) {
            Some(&idx) => {
                if rating.votes > kept[idx].votes {
                    kept[idx] = rating;
                }
            }
            None => {
                index.insert(rating.source.clone(), kept.len());
                kept.push(rating);
            }
        }
    }

    kept
}

// ---------------------------------------------------------------------------
// Weighted rating
// ---------------------------------------------------------------------------

/// Combine a movie's ratings into a single 0-10 score.
///
/// Each rating is normalized to 0-10 and weighted by source; the weighted sum
/// is divided by the weights actually used. Ratings with a non-positive scale
/// are ignored.
pub fn calculate_weighted_rating(movie: &Movie) -> AggregatedRating {
    let mut breakdown = BTreeMap::new();
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for rating in &movie.ratings {
        let Some(normalized) = rating.normalized() else {
            continue;
        };
        let weight = source_weight(&rating.source);
        weighted_sum += normalized * weight;
        weight_total += weight;
        breakdown.insert(rating.source.clone(), normalized);
    }

    let score = if weight_total > 0.0 {
        round_one_decimal(weighted_sum / weight_total)
    } else {
        0.0
    };

    AggregatedRating { score, breakdown }
}

/// Return a copy of `movie` carrying its freshly computed aggregated rating.
pub fn with_aggregated_rating(mut movie: Movie) -> Movie {
    movie.aggregated_rating = Some(calculate_weighted_rating(&movie));
    movie
}

// ---------------------------------------------------------------------------
// Deduplication
// ---------------------------------------------------------------------------

/// Grouping key: lowercased title plus year, or `unknown` when absent.
pub fn dedup_key(movie: &Movie) -> String {
    match movie.year {
        Some(year) => format!("{}-{}", movie.title.to_lowercase(), year),
        None => format!("{}-unknown", movie.title.to_lowercase()),
    }
}

/// Group records by [`dedup_key`] and merge each group.
///
/// Groups come back in order of first appearance. A group that fails to merge
/// is logged and dropped without affecting the others.
pub fn deduplicate_movies(movies: &[Movie]) -> Vec<Movie> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<Movie>)> = Vec::new();

    for movie in movies {
        let key = dedup_key(movie);
        match index.get(&key) {
            Some(&idx) => groups[idx].1.push(movie.clone()),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![movie.clone()]));
            }
        }
    }

    groups
        .into_iter()
        .filter_map(|(key, group)| match merge_movies(&group) {
            Ok(merged) => Some(merged),
            Err(e) => {
                warn!(key = %key, error = %e, "Dropping movie group that failed to merge");
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Relevance
// ---------------------------------------------------------------------------

/// Score for matching `text` against the query: exact, prefix, or containment.
fn match_points(text: &str, query: &str, exact: u32, prefix: u32, contains: u32) -> u32 {
    if text.is_empty() {
        return 0;
    }
    if text == query {
        exact
    } else if text.starts_with(query) {
        prefix
    } else if text.contains(query) || query.contains(text) {
        contains
    } else {
        0
    }
}

/// Additive relevance score of `movie` for an already-lowercased query.
pub fn calculate_relevance_score(movie: &Movie, query: &str) -> u32 {
    if query.is_empty() {
        return 0;
    }

    let mut score = match_points(&movie.title.to_lowercase(), query, 100, 80, 60);

    if let Some(original) = &movie.original_title {
        score += match_points(&original.to_lowercase(), query, 90, 70, 50);
    }

    let token = YEAR_TOKEN.captures(query).and_then(|c| c.get(1));
    if let (Some(year), Some(token)) = (movie.year, token) {
        if let Ok(query_year) = token.as_str().parse::<i32>() {
            match year.abs_diff(query_year) {
                0 => score += 40,
                1..=2 => score += 20,
                _ => {}
            }
        }
    }

    let genre_hit = movie.genres.iter().any(|g| {
        let g = g.to_lowercase();
        !g.is_empty() && (query.contains(&g) || g.contains(query))
    });
    if genre_hit {
        score += 30;
    }

    if movie
        .directors
        .iter()
        .any(|d| d.to_lowercase().contains(query))
    {
        score += 25;
    }

    if movie.cast.iter().any(|c| c.to_lowercase().contains(query)) {
        score += 20;
    }

    score
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Unicode collation order, with the raw title as a final tie-break so the
/// ordering stays total.
fn compare_titles(collator: &mut Collator, a: &Movie, b: &Movie) -> Ordering {
    collator
        .collate(a.title.as_str(), b.title.as_str())
        .then_with(|| a.title.cmp(&b.title))
}

/// Sort by weighted score descending, then total votes descending.
fn sort_by_rating(movies: &mut [Movie]) {
    let mut keyed: Vec<(f64, u64, usize)> = movies
        .iter()
        .enumerate()
        .map(|(i, m)| (calculate_weighted_rating(m).score, m.total_votes(), i))
        .collect();
    keyed.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.cmp(&a.1)));
    reorder(movies, keyed.into_iter().map(|(_, _, i)| i));
}

/// Sort by relevance score descending, then weighted score descending.
fn sort_by_relevance(movies: &mut [Movie], query: &str) {
    let mut keyed: Vec<(u32, f64, usize)> = movies
        .iter()
        .enumerate()
        .map(|(i, m)| {
            (
                calculate_relevance_score(m, query),
                calculate_weighted_rating(m).score,
                i,
            )
        })
        .collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.total_cmp(&a.1)));
    reorder(movies, keyed.into_iter().map(|(_, _, i)| i));
}

fn reorder(movies: &mut [Movie], order: impl Iterator<Item = usize>) {
    let snapshot: Vec<Movie> = movies.to_vec();
    for (slot, idx) in order.enumerate() {
        movies[slot] = snapshot[idx].clone();
    }
}

/// Return a sorted copy of `movies`. The input is left untouched.
///
/// `Relevance` uses the relevance scorer when a non-blank query is given and
/// falls back to weighted rating otherwise.
pub fn sort_movies(movies: &[Movie], mode: SortMode, query: Option<&str>) -> Vec<Movie> {
    let mut sorted = movies.to_vec();

    match mode {
        SortMode::YearDesc => sorted.sort_by(|a, b| b.year.unwrap_or(0).cmp(&a.year.unwrap_or(0))),
        SortMode::YearAsc => sorted.sort_by(|a, b| a.year.unwrap_or(0).cmp(&b.year.unwrap_or(0))),
        SortMode::TitleAz => {
            let mut collator = Collator::default();
            sorted.sort_by(|a, b| compare_titles(&mut collator, a, b));
        }
        SortMode::TitleZa => {
            let mut collator = Collator::default();
            sorted.sort_by(|a, b| compare_titles(&mut collator, b, a));
        }
        SortMode::VotesDesc => sorted.sort_by(|a, b| b.total_votes().cmp(&a.total_votes())),
        SortMode::VotesAsc => sorted.sort_by(|a, b| a.total_votes().cmp(&b.total_votes())),
        SortMode::Relevance => {
            let query = query.map(|q| q.trim().to_lowercase()).unwrap_or_default();
            if query.is_empty() {
                sort_by_rating(&mut sorted);
            } else {
                sort_by_relevance(&mut sorted, &query);
            }
        }
    }

    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use moviehub_common::ExternalIds;

    fn movie(id: &str, title: &str, year: Option<i32>, source: &str) -> Movie {
        let mut m = Movie::new(id, title);
        m.year = year;
        m.sources = vec![source.to_string()];
        m
    }

    fn rated(mut m: Movie, source: &str, value: f64, max: f64, votes: Option<u64>) -> Movie {
        let mut r = Rating::new(source, value, max);
        r.votes = votes;
        m.ratings.push(r);
        m
    }

    #[test]
    fn merge_empty_fails() {
        let err = merge_movies(&[]).unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }

    #[test]
    fn merge_single_is_identity() {
        let mut m = movie("tmdb-1", "Dune", Some(2021), "tmdb");
        m.ratings.push(Rating::new("tmdb", 8.0, 10.0));
        m.ratings.push(Rating::new("tmdb", 7.0, 10.0));
        assert_eq!(merge_movies(&[m.clone()]).unwrap(), m);
    }

    #[test]
    fn merge_dune_scenario() {
        let a = rated(movie("tmdb-438631", "Dune", None, "tmdb"), "tmdb", 8.0, 10.0, Some(1000));
        let b = rated(
            movie("omdb-tt1160419", "Dune", None, "omdb"),
            "imdb",
            8.5,
            10.0,
            Some(500_000),
        );

        let merged = merge_movies(&[a, b]).unwrap();
        assert_eq!(merged.id, "tmdb-438631");
        assert_eq!(merged.sources, vec!["tmdb", "omdb"]);
        assert_eq!(merged.ratings.len(), 2);
        assert_eq!(calculate_weighted_rating(&merged).score, 8.3);
    }

    #[test]
    fn merge_keeps_rating_with_more_votes() {
        let a = rated(movie("a", "X", None, "tmdb"), "imdb", 7.0, 10.0, Some(10));
        let b = rated(movie("b", "X", None, "omdb"), "imdb", 8.0, 10.0, Some(900));
        let merged = merge_movies(&[a, b]).unwrap();
        assert_eq!(merged.ratings.len(), 1);
        assert_eq!(merged.ratings[0].value, 8.0);
    }

    #[test]
    fn merge_present_votes_beat_missing() {
        let a = rated(movie("a", "X", None, "tmdb"), "imdb", 7.0, 10.0, None);
        let b = rated(movie("b", "X", None, "omdb"), "imdb", 8.0, 10.0, Some(0));
        let merged = merge_movies(&[a, b]).unwrap();
        assert_eq!(merged.ratings[0].votes, Some(0));
    }

    #[test]
    fn merge_vote_tie_keeps_first() {
        let a = rated(movie("a", "X", None, "tmdb"), "imdb", 7.0, 10.0, Some(5));
        let b = rated(movie("b", "X", None, "omdb"), "imdb", 9.0, 10.0, Some(5));
        let merged = merge_movies(&[a, b]).unwrap();
        assert_eq!(merged.ratings[0].value, 7.0);
    }

    #[test]
    fn merge_first_non_empty_scalar_wins() {
        let mut a = movie("a", "X", None, "tmdb");
        a.plot = Some(String::new());
        a.runtime = Some(0);
        let mut b = movie("b", "X", None, "omdb");
        b.plot = Some("From omdb".into());
        b.poster = Some("omdb.jpg".into());
        b.runtime = Some(120);
        let mut c = movie("c", "X", None, "tvmaze");
        c.plot = Some("From tvmaze".into());
        c.poster = Some("tvmaze.jpg".into());
        c.backdrop = Some("tvmaze-bg.jpg".into());

        let merged = merge_movies(&[a, b, c]).unwrap();
        assert_eq!(merged.plot.as_deref(), Some("From omdb"));
        assert_eq!(merged.poster.as_deref(), Some("omdb.jpg"));
        assert_eq!(merged.backdrop.as_deref(), Some("tvmaze-bg.jpg"));
        assert_eq!(merged.runtime, Some(120));
    }

    #[test]
    fn merge_external_ids_last_write_wins() {
        let mut a = movie("a", "X", None, "tmdb");
        a.external_ids = ExternalIds {
            imdb: Some("tt-old".into()),
            tmdb: Some(1),
            tvmaze: None,
        };
        let mut b = movie("b", "X", None, "omdb");
        b.external_ids.imdb = Some("tt-new".into());

        let merged = merge_movies(&[a, b]).unwrap();
        assert_eq!(merged.external_ids.imdb.as_deref(), Some("tt-new"));
        assert_eq!(merged.external_ids.tmdb, Some(1));
    }

    #[test]
    fn merge_unions_lists_in_first_seen_order() {
        let mut a = movie("a", "X", None, "tmdb");
        a.genres = vec!["Drama".into(), "Sci-Fi".into()];
        a.cast = vec!["Ana".into()];
        let mut b = movie("b", "X", None, "omdb");
        b.genres = vec!["Sci-Fi".into(), "Action".into()];
        b.cast = vec!["Ben".into(), "Ana".into()];
        b.directors = vec!["Villeneuve".into()];

        let merged = merge_movies(&[a, b]).unwrap();
        assert_eq!(merged.genres, vec!["Drama", "Sci-Fi", "Action"]);
        assert_eq!(merged.cast, vec!["Ana", "Ben"]);
        assert_eq!(merged.directors, vec!["Villeneuve"]);
    }

    #[test]
    fn weighted_rating_empty_is_zero() {
        let rating = calculate_weighted_rating(&movie("a", "X", None, "tmdb"));
        assert_eq!(rating.score, 0.0);
        assert!(rating.breakdown.is_empty());
    }

    #[test]
    fn weighted_rating_normalizes_scales() {
        let m = rated(
            rated(movie("a", "X", None, "omdb"), "imdb", 8.0, 10.0, None),
            "rotten_tomatoes",
            90.0,
            100.0,
            None,
        );
        let rating = calculate_weighted_rating(&m);
        // (8.0 * 0.4 + 9.0 * 0.2) / 0.6 = 8.333
        assert_eq!(rating.score, 8.3);
        assert!((rating.breakdown["rotten_tomatoes"] - 9.0).abs() < 1e-9);
        assert!((rating.breakdown["imdb"] - 8.0).abs() < 1e-9);
    }

    #[test]
    fn weighted_rating_unknown_source_uses_default_weight() {
        let m = rated(
            rated(movie("a", "X", None, "tvmaze"), "tvmaze", 6.0, 10.0, None),
            "metacritic",
            80.0,
            100.0,
            None,
        );
        // Both weigh 0.1: plain average.
        assert_eq!(calculate_weighted_rating(&m).score, 7.0);
    }

    #[test]
    fn weighted_rating_stays_in_bounds() {
        let m = rated(
            rated(movie("a", "X", None, "x"), "imdb", 15.0, 10.0, None),
            "tmdb",
            -3.0,
            10.0,
            None,
        );
        let score = calculate_weighted_rating(&m).score;
        assert!((0.0..=10.0).contains(&score));

        let broken = rated(movie("b", "Y", None, "x"), "imdb", 5.0, 0.0, None);
        assert_eq!(calculate_weighted_rating(&broken).score, 0.0);
    }

    #[test]
    fn dedupe_inception_scenario() {
        let a = movie("tmdb-27205", "Inception", Some(2010), "tmdb");
        let b = movie("omdb-tt1375666", "Inception", Some(2010), "omdb");
        let out = deduplicate_movies(&[a, b]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].sources, vec!["tmdb", "omdb"]);
    }

    #[test]
    fn dedupe_preserves_first_occurrence_order() {
        let movies = vec![
            movie("1", "Heat", Some(1995), "tmdb"),
            movie("2", "Alien", Some(1979), "tmdb"),
            movie("3", "heat", Some(1995), "omdb"),
            movie("4", "Alien", None, "tvmaze"),
        ];
        let out = deduplicate_movies(&movies);
        let ids: Vec<&str> = out.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "4"]);
        assert_eq!(dedup_key(&out[2]), "alien-unknown");
    }

    #[test]
    fn dedupe_is_idempotent() {
        let movies = vec![
            rated(movie("1", "Heat", Some(1995), "tmdb"), "tmdb", 8.0, 10.0, Some(3)),
            rated(movie("2", "Heat", Some(1995), "omdb"), "imdb", 8.3, 10.0, Some(9)),
            movie("3", "Ronin", Some(1998), "tvmaze"),
        ];
        let once = deduplicate_movies(&movies);
        let twice = deduplicate_movies(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn sort_year_desc_missing_last() {
        let movies = vec![
            movie("a", "A", Some(2010), "tmdb"),
            movie("b", "B", None, "tmdb"),
            movie("c", "C", Some(1999), "tmdb"),
        ];
        let sorted = sort_movies(&movies, SortMode::YearDesc, None);
        let years: Vec<Option<i32>> = sorted.iter().map(|m| m.year).collect();
        assert_eq!(years, vec![Some(2010), Some(1999), None]);
        // Input untouched.
        assert_eq!(movies[1].year, None);
    }

    #[test]
    fn sort_year_asc_missing_first() {
        let movies = vec![
            movie("a", "A", Some(2010), "tmdb"),
            movie("b", "B", None, "tmdb"),
            movie("c", "C", Some(1999), "tmdb"),
        ];
        let sorted = sort_movies(&movies, SortMode::YearAsc, None);
        let ids: Vec<&str> = sorted.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn sort_titles_case_insensitive() {
        let movies = vec![
            movie("1", "zodiac", None, "tmdb"),
            movie("2", "Alien", None, "tmdb"),
            movie("3", "memento", None, "tmdb"),
        ];
        let az: Vec<String> = sort_movies(&movies, SortMode::TitleAz, None)
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(az, vec!["Alien", "memento", "zodiac"]);

        let za: Vec<String> = sort_movies(&movies, SortMode::TitleZa, None)
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(za, vec!["zodiac", "memento", "Alien"]);
    }

    #[test]
    fn sort_titles_collates_accents() {
        let movies = vec![
            movie("1", "Zorro", None, "tmdb"),
            movie("2", "Élite", None, "tmdb"),
            movie("3", "Amélie", None, "tmdb"),
            movie("4", "elephant", None, "tmdb"),
        ];
        let az: Vec<String> = sort_movies(&movies, SortMode::TitleAz, None)
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(az, vec!["Amélie", "elephant", "Élite", "Zorro"]);

        let za: Vec<String> = sort_movies(&movies, SortMode::TitleZa, None)
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(za, vec!["Zorro", "Élite", "elephant", "Amélie"]);
    }

    #[test]
    fn sort_by_votes() {
        let movies = vec![
            rated(movie("a", "A", None, "tmdb"), "tmdb", 5.0, 10.0, Some(10)),
            movie("b", "B", None, "tmdb"),
            rated(movie("c", "C", None, "tmdb"), "tmdb", 5.0, 10.0, Some(500)),
        ];
        let desc: Vec<String> = sort_movies(&movies, SortMode::VotesDesc, None)
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(desc, vec!["c", "a", "b"]);
        let asc: Vec<String> = sort_movies(&movies, SortMode::VotesAsc, None)
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(asc, vec!["b", "a", "c"]);
    }

    #[test]
    fn relevance_without_query_sorts_by_rating_then_votes() {
        let movies = vec![
            rated(movie("low", "A", None, "tmdb"), "tmdb", 5.0, 10.0, Some(9000)),
            rated(movie("tie-few", "B", None, "tmdb"), "tmdb", 8.0, 10.0, Some(10)),
            rated(movie("tie-many", "C", None, "tmdb"), "tmdb", 8.0, 10.0, Some(100)),
        ];
        let ids: Vec<String> = sort_movies(&movies, SortMode::Relevance, None)
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["tie-many", "tie-few", "low"]);

        let blank: Vec<String> = sort_movies(&movies, SortMode::Relevance, Some("  "))
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(blank, ids);
    }

    #[test]
    fn relevance_with_query_prefers_title_matches() {
        let movies = vec![
            rated(movie("sequel", "The Matrix Reloaded", Some(2003), "tmdb"), "tmdb", 9.9, 10.0, None),
            rated(movie("exact", "The Matrix", Some(1999), "tmdb"), "tmdb", 5.0, 10.0, None),
            rated(movie("other", "Speed", Some(1994), "tmdb"), "tmdb", 9.9, 10.0, None),
        ];
        let ids: Vec<String> = sort_movies(&movies, SortMode::Relevance, Some("The Matrix"))
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["exact", "sequel", "other"]);
    }

    #[test]
    fn relevance_dune_scenario() {
        let m = movie("tmdb-438631", "Dune", Some(2021), "tmdb");
        assert_eq!(calculate_relevance_score(&m, "dune 2021"), 100);
    }

    #[test]
    fn year_bonus_applies_next_to_cjk_text() {
        let m = movie("tmdb-438631", "沙丘", Some(2021), "tmdb");
        let spaced = calculate_relevance_score(&m, "沙丘 2021");
        assert_eq!(spaced, 100);
        assert_eq!(calculate_relevance_score(&m, "沙丘2021"), spaced);
        assert_eq!(calculate_relevance_score(&m, "2021年的沙丘"), spaced);
        // Digits glued to latin letters are not a year.
        let dune = movie("tmdb-438631", "Dune", Some(2021), "tmdb");
        assert_eq!(calculate_relevance_score(&dune, "dune2021"), 60);
        assert_eq!(calculate_relevance_score(&dune, "dune 20210"), 60);
    }

    #[test]
    fn extreme_years_and_votes_do_not_overflow() {
        let m = movie("x", "Dune", Some(i32::MIN), "tmdb");
        assert_eq!(calculate_relevance_score(&m, "dune 2021"), 60);

        let a = rated(movie("1", "Dune", None, "tmdb"), "tmdb", 8.0, 10.0, Some(5));
        let mut b = rated(movie("2", "Dune", None, "omdb"), "imdb", 8.0, 10.0, Some(u64::MAX));
        b.ratings.extend(a.ratings.clone());
        assert_eq!(b.total_votes(), u64::MAX);
        let sorted = sort_movies(&[a, b], SortMode::VotesDesc, None);
        assert_eq!(sorted[0].id, "2");
    }

    #[test]
    fn relevance_components() {
        let mut m = movie("x", "Arrival", Some(2016), "tmdb");
        m.original_title = Some("Arrival".into());
        m.genres = vec!["Science Fiction".into()];
        m.directors = vec!["Denis Villeneuve".into()];
        m.cast = vec!["Amy Adams".into()];

        assert_eq!(calculate_relevance_score(&m, "arrival"), 190);
        assert_eq!(calculate_relevance_score(&m, "villeneuve"), 25);
        assert_eq!(calculate_relevance_score(&m, "amy"), 20);
        assert_eq!(calculate_relevance_score(&m, "science fiction 2018"), 50);
        assert_eq!(calculate_relevance_score(&m, "nothing"), 0);
        assert_eq!(calculate_relevance_score(&m, ""), 0);
    }

    #[test]
    fn sort_is_idempotent_for_every_mode() {
        let movies = vec![
            rated(movie("1", "Heat", Some(1995), "tmdb"), "tmdb", 8.0, 10.0, Some(3)),
            rated(movie("2", "heat", Some(1995), "omdb"), "imdb", 8.3, 10.0, Some(9)),
            movie("3", "Ronin", None, "tvmaze"),
            rated(movie("4", "Alien", Some(1979), "tmdb"), "tmdb", 8.5, 10.0, Some(9)),
        ];
        let modes = [
            SortMode::Relevance,
            SortMode::YearDesc,
            SortMode::YearAsc,
            SortMode::TitleAz,
            SortMode::TitleZa,
            SortMode::VotesDesc,
            SortMode::VotesAsc,
        ];
        for mode in modes {
            for query in [None, Some("heat")] {
                let once = sort_movies(&movies, mode, query);
                let twice = sort_movies(&once, mode, query);
                assert_eq!(once, twice, "mode {mode} query {query:?}");
            }
        }
    }
}
