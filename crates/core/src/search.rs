#![forbid(unsafe_code)]

use crate::hold::HoldStatus;
use crate::ids::PostId;
use crate::model::PostStatus;

/// Compact post row used by search results and hold listings.
#[derive(Clone, Debug, PartialEq)]
pub struct PostSummary {
    pub id: PostId,
    pub post_number: String,
    pub template_name: String,
    pub facility: String,
    pub location: Option<String>,
    pub author: String,
    pub status: PostStatus,
    pub completion_rate: f64,
    pub hold_status: HoldStatus,
    pub created_at_ms: i64,
}

/// Case-insensitive substring match over post number, template name, location and author.
/// A blank query matches everything.
pub fn matches_query(summary: &PostSummary, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let location = summary.location.as_deref().unwrap_or_default();
    [
        summary.post_number.as_str(),
        summary.template_name.as_str(),
        location,
        summary.author.as_str(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&needle))
}

/// Filters an already recency-ordered window of posts and keeps at most `limit` hits.
pub fn filter_recent(recent: Vec<PostSummary>, query: &str, limit: usize) -> Vec<PostSummary> {
    recent
        .into_iter()
        .filter(|summary| matches_query(summary, query))
        .take(limit)
        .collect()
}
