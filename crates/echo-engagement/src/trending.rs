use std::cmp::Ordering;

use echo_types::models::{Post, ReactionKind};

/// Number of posts on the trending page.
pub const TRENDING_LIMIT: usize = 10;

/// Engagement score: hearts plus flames. Frowns and emoji reactions are
/// sympathy, not amplification, and don't count.
pub fn score(post: &Post) -> u64 {
    u64::from(post.reaction_count(ReactionKind::Hearts))
        + u64::from(post.reaction_count(ReactionKind::Flames))
}

#[derive(Debug, Clone, Copy)]
pub struct TrendingRanker {
    limit: usize,
}

impl Default for TrendingRanker {
    fn default() -> Self {
        Self {
            limit: TRENDING_LIMIT,
        }
    }
}

impl TrendingRanker {
    pub fn with_limit(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Highest score first. Equal scores put the newer post first, then
    /// the lower id, so the order never depends on input order.
    pub fn rank(&self, posts: &[Post]) -> Vec<Post> {
        let mut ranked: Vec<&Post> = posts.iter().collect();
        ranked.sort_by(|a, b| compare(a, b));
        ranked.into_iter().take(self.limit).cloned().collect()
    }
}

/// [`TrendingRanker::rank`] with the default limit.
pub fn rank(posts: &[Post]) -> Vec<Post> {
    TrendingRanker::default().rank(posts)
}

fn compare(a: &Post, b: &Post) -> Ordering {
    score(b)
        .cmp(&score(a))
        .then_with(|| b.timestamp.cmp(&a.timestamp))
        .then_with(|| a.id.cmp(&b.id))
}
