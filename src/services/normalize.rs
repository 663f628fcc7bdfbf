use chrono::{DateTime, Duration, Utc};

use crate::models::github::{
    InsightRepo, LanguageCount, LanguageStats, RawEvent, RepoStatsSummary, StarredRepo,
    StarredSummary, StatsRepo, TopLanguage,
};

/// How many starred repos the summary samples for languages and the
/// recent list, out of the full fetched page.
const STARRED_SAMPLE: usize = 10;
const TOP_LANGUAGES: usize = 5;
const INSIGHT_TOP_LANGUAGES: usize = 3;
const RECENT_WINDOW_DAYS: i64 = 30;

/// Count repos per language, skipping repos GitHub reports no language
/// for. The tally keeps first-seen order so equal counts rank by which
/// language appeared first.
pub fn tally_languages(repos: &[StatsRepo]) -> LanguageStats {
    let mut languages: Vec<LanguageCount> = Vec::new();

    for repo in repos {
        let Some(language) = repo.language.as_deref() else {
            continue;
        };
        match languages.iter_mut().find(|c| c.language == language) {
            Some(entry) => entry.count += 1,
            None => languages.push(LanguageCount {
                language: language.to_string(),
                count: 1,
            }),
        }
    }

    let total_repos: u32 = languages.iter().map(|c| c.count).sum();
    let top_languages = top_n(&languages, TOP_LANGUAGES, |c| c.count)
        .into_iter()
        .map(|c| TopLanguage {
            percentage: percentage(c.count, total_repos),
            language: c.language,
            count: c.count,
        })
        .collect();

    LanguageStats {
        total_repos,
        languages,
        top_languages,
    }
}

/// Top `n` items by `count`, descending. The sort is stable, so ties
/// keep their input order.
pub fn top_n<T: Clone>(items: &[T], n: usize, count: impl Fn(&T) -> u32) -> Vec<T> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| count(b).cmp(&count(a)));
    sorted.truncate(n);
    sorted
}

fn percentage(count: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((count as f64 / total as f64) * 100.0).round() as u32
}

/// Reduce a page of starred repos to the summary shape.
///
/// `total_starred` counts the whole page; the language tally and the
/// recent list are computed over the first ten entries only.
pub fn summarize_starred(repos: Vec<StarredRepo>) -> StarredSummary {
    let total_starred = repos.len();
    let sample: Vec<StarredRepo> = repos.into_iter().take(STARRED_SAMPLE).collect();

    let mut tally: Vec<LanguageCount> = Vec::new();
    for repo in &sample {
        let Some(language) = repo.language.as_deref() else {
            continue;
        };
        match tally.iter_mut().find(|c| c.language == language) {
            Some(entry) => entry.count += 1,
            None => tally.push(LanguageCount {
                language: language.to_string(),
                count: 1,
            }),
        }
    }

    StarredSummary {
        total_starred,
        top_starred_languages: top_n(&tally, TOP_LANGUAGES, |c| c.count),
        recent_stars: sample,
    }
}

/// Flatten user events into commit messages.
///
/// Keeps only push events that actually carry commits, preserving event
/// order and the commit order within each event.
pub fn flatten_push_events(events: Vec<RawEvent>) -> Vec<String> {
    events
        .into_iter()
        .filter(|e| e.event_type == "PushEvent")
        .filter_map(|e| e.payload.commits)
        .filter(|commits| !commits.is_empty())
        .flatten()
        .map(|c| c.message)
        .collect()
}

/// Aggregate repo stats for the insight cards: star/fork totals, the
/// three most common languages (unknown bucketed as "Unknown"), and how
/// many repos were updated within the last 30 days of `now`.
pub fn summarize_repo_stats(repos: &[InsightRepo], now: DateTime<Utc>) -> RepoStatsSummary {
    let total_stars: u64 = repos.iter().map(|r| r.stargazers_count as u64).sum();
    let total_forks: u64 = repos.iter().map(|r| r.forks_count as u64).sum();

    let mut tally: Vec<LanguageCount> = Vec::new();
    for repo in repos {
        let language = repo.language.as_deref().unwrap_or("Unknown");
        match tally.iter_mut().find(|c| c.language == language) {
            Some(entry) => entry.count += 1,
            None => tally.push(LanguageCount {
                language: language.to_string(),
                count: 1,
            }),
        }
    }
    let top_languages = top_n(&tally, INSIGHT_TOP_LANGUAGES, |c| c.count)
        .into_iter()
        .map(|c| {
            let plural = if c.count > 1 { "s" } else { "" };
            format!("{} ({} repo{})", c.language, c.count, plural)
        })
        .collect();

    let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
    let recent_count = repos.iter().filter(|r| r.updated_at > cutoff).count();

    RepoStatsSummary {
        total_stars,
        total_forks,
        top_languages,
        recent_count,
    }
}
