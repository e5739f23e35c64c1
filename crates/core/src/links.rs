//! Link ranking across a job's responses.

use crate::constants::MPI_MATCH_EXTENSION_URL;
use crate::models::{Link, MatchJob};
use fhir::Bundle;
use std::str::FromStr;

/// Which end of the score ranking to return.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkCategory {
    #[default]
    Best,
    Worst,
}

impl FromStr for LinkCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best" => Ok(Self::Best),
            "worst" => Ok(Self::Worst),
            other => Err(format!("unknown link category '{other}'")),
        }
    }
}

/// Every link reported across `job`'s responses, sorted ascending by score.
///
/// Entries qualify when they carry no resource, a `fullUrl`, a search score and at least one
/// `related` link. The sort is stable, so equal scores keep their arrival order.
pub fn job_links(job: &MatchJob) -> Vec<Link> {
    let mut links: Vec<Link> = job
        .responses
        .iter()
        .flat_map(|r| message_links(&r.message))
        .collect();
    links.sort_by(|a, b| a.score.total_cmp(&b.score));
    links
}

fn message_links(message: &Bundle) -> Vec<Link> {
    message
        .entry
        .iter()
        .filter(|e| e.resource.is_none())
        .filter_map(|entry| {
            let source = entry.full_url()?;
            let score = entry.score()?;
            let grade = entry
                .search
                .as_ref()
                .and_then(|s| s.extension_code(MPI_MATCH_EXTENSION_URL))
                .map(str::to_owned);
            Some(entry.related_links().map(move |link| Link {
                source: source.to_owned(),
                target: link.url.clone(),
                match_grade: grade.clone(),
                score,
            }))
        })
        .flatten()
        .collect()
}

/// The `limit` lowest-scored links, ascending.
pub fn worst_links(sorted: &[Link], limit: usize) -> &[Link] {
    &sorted[..limit.min(sorted.len())]
}

/// The `limit` highest-scored links, ascending.
pub fn best_links(sorted: &[Link], limit: usize) -> &[Link] {
    &sorted[sorted.len().saturating_sub(limit)..]
}

/// Selects links from `sorted` by category.
pub fn select_links(sorted: &[Link], category: LinkCategory, limit: usize) -> &[Link] {
    match category {
        LinkCategory::Best => best_links(sorted, limit),
        LinkCategory::Worst => worst_links(sorted, limit),
    }
}
