use echo_types::models::{GroupMessage, Post};

/// Posts shown on the live page.
pub const LIVE_FEED_LIMIT: usize = 20;

/// Newest first; equal timestamps fall back to id order.
pub fn newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
}

/// Oldest first, the order a chat is read in.
pub fn chronological(messages: &mut [GroupMessage]) {
    messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
}

/// The `limit` most recent posts, newest first.
pub fn live(posts: &[Post], limit: usize) -> Vec<Post> {
    let mut recent = posts.to_vec();
    newest_first(&mut recent);
    recent.truncate(limit);
    recent
}

/// Posts whose category label is exactly `category`.
pub fn by_category(posts: &[Post], category: &str) -> Vec<Post> {
    posts
        .iter()
        .filter(|p| p.category.as_ref().is_some_and(|c| c.as_str() == category))
        .cloned()
        .collect()
}

/// Case-insensitive substring match on content or category label.
/// A blank query matches nothing.
pub fn search(posts: &[Post], query: &str) -> Vec<Post> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return vec![];
    }

    posts
        .iter()
        .filter(|p| {
            p.content.to_lowercase().contains(&needle)
                || p
                    .category
                    .as_ref()
                    .is_some_and(|c| c.as_str().to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}
