//! Reaction bookkeeping for posts.
//!
//! A user holds at most one reaction per post. Reacting again with the same
//! kind takes it back; reacting with another kind moves it. After every call
//! `reactions[k]` equals the number of users whose entry is `k`.

use std::collections::BTreeMap;

use echo_types::models::{Post, ReactionKind};
use tracing::debug;

use crate::error::{EngagementError, Result};

/// Apply `user_id`'s reaction to `post`, returning the updated snapshot.
///
/// `kind` is the raw name sent by the client and must be one of
/// [`ReactionKind::ALL`].
pub fn apply(post: &Post, user_id: &str, kind: &str) -> Result<Post> {
    let kind = ReactionKind::parse(kind)
        .ok_or_else(|| EngagementError::InvalidReactionKind(kind.to_string()))?;
    Ok(apply_kind(post, user_id, kind))
}

/// Typed form of [`apply`].
pub fn apply_kind(post: &Post, user_id: &str, kind: ReactionKind) -> Post {
    let mut next = post.clone();

    match next.user_reactions.get(user_id).copied() {
        Some(current) if current == kind => {
            decrement(&mut next.reactions, kind);
            next.user_reactions.remove(user_id);
            debug!("post {}: {} took back {}", post.id, user_id, kind);
        }
        Some(current) => {
            decrement(&mut next.reactions, current);
            increment(&mut next.reactions, kind);
            next.user_reactions.insert(user_id.to_string(), kind);
            debug!("post {}: {} switched {} -> {}", post.id, user_id, current, kind);
        }
        None => {
            increment(&mut next.reactions, kind);
            next.user_reactions.insert(user_id.to_string(), kind);
            debug!("post {}: {} reacted {}", post.id, user_id, kind);
        }
    }

    next
}

/// True when every count matches the number of users holding that kind.
pub fn is_consistent(post: &Post) -> bool {
    let tally = tally(post);
    ReactionKind::ALL
        .into_iter()
        .all(|kind| post.reaction_count(kind) == tally.get(&kind).copied().unwrap_or(0))
}

/// Rebuild the counts from `user_reactions`, keeping the keys the snapshot
/// already had (and the primary kinds) at zero where nobody holds them.
pub fn reconcile(post: &Post) -> Post {
    let mut next = post.clone();
    let mut counts: BTreeMap<ReactionKind, u32> = post
        .reactions
        .keys()
        .copied()
        .chain(ReactionKind::PRIMARY)
        .map(|kind| (kind, 0))
        .collect();
    counts.extend(tally(post));
    next.reactions = counts;
    next
}

fn tally(post: &Post) -> BTreeMap<ReactionKind, u32> {
    let mut tally = BTreeMap::new();
    for kind in post.user_reactions.values() {
        *tally.entry(*kind).or_insert(0) += 1;
    }
    tally
}

fn increment(counts: &mut BTreeMap<ReactionKind, u32>, kind: ReactionKind) {
    let count = counts.entry(kind).or_insert(0);
    *count = count.saturating_add(1);
}

// Floors at zero; the key stays so clients keep rendering the counter.
fn decrement(counts: &mut BTreeMap<ReactionKind, u32>, kind: ReactionKind) {
    let count = counts.entry(kind).or_insert(0);
    *count = count.saturating_sub(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn fresh_post() -> Post {
        Post {
            id: Uuid::new_v4(),
            content: "first night in the new city".into(),
            timestamp: 1_000,
            category: None,
            reactions: ReactionKind::PRIMARY.into_iter().map(|k| (k, 0)).collect(),
            user_reactions: BTreeMap::new(),
            replies: vec![],
        }
    }

    fn counts(post: &Post) -> (u32, u32, u32) {
        (
            post.reaction_count(ReactionKind::Hearts),
            post.reaction_count(ReactionKind::Flames),
            post.reaction_count(ReactionKind::Frowns),
        )
    }

    #[test]
    fn react_switch_then_take_back() {
        let post = fresh_post();

        let post = apply(&post, "u1", "hearts").unwrap();
        assert_eq!(counts(&post), (1, 0, 0));
        assert_eq!(post.user_reactions.get("u1"), Some(&ReactionKind::Hearts));

        let post = apply(&post, "u1", "flames").unwrap();
        assert_eq!(counts(&post), (0, 1, 0));
        assert_eq!(post.user_reactions.get("u1"), Some(&ReactionKind::Flames));

        let post = apply(&post, "u1", "flames").unwrap();
        assert_eq!(counts(&post), (0, 0, 0));
        assert!(post.user_reactions.is_empty());
    }

    #[test]
    fn toggle_on_then_off_restores_post() {
        let original = fresh_post();
        let on = apply(&original, "u1", "frowns").unwrap();
        assert_ne!(on, original);
        let off = apply(&on, "u1", "frowns").unwrap();
        assert_eq!(off, original);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = apply(&fresh_post(), "u1", "angry").unwrap_err();
        assert_eq!(err, EngagementError::InvalidReactionKind("angry".into()));
    }

    #[test]
    fn emoji_kinds_share_the_ledger() {
        let post = apply(&fresh_post(), "u1", "hearts").unwrap();
        let post = apply(&post, "u1", "laugh").unwrap();
        assert_eq!(post.reaction_count(ReactionKind::Hearts), 0);
        assert_eq!(post.reaction_count(ReactionKind::Laugh), 1);
        assert!(is_consistent(&post));
    }

    #[test]
    fn users_are_counted_independently() {
        let post = apply(&fresh_post(), "u1", "hearts").unwrap();
        let post = apply(&post, "u2", "hearts").unwrap();
        let post = apply(&post, "u3", "flames").unwrap();
        assert_eq!(counts(&post), (2, 1, 0));

        let post = apply(&post, "u2", "hearts").unwrap();
        assert_eq!(counts(&post), (1, 1, 0));
    }

    #[test]
    fn decrement_never_goes_negative_on_drifted_snapshot() {
        let mut post = fresh_post();
        // count lost by an earlier last-writer-wins race
        post.user_reactions.insert("u1".into(), ReactionKind::Hearts);

        let post = apply(&post, "u1", "flames").unwrap();
        assert_eq!(counts(&post), (0, 1, 0));
    }

    #[test]
    fn reconcile_repairs_drifted_counts() {
        let mut post = fresh_post();
        post.reactions.insert(ReactionKind::Hearts, 7);
        post.user_reactions.insert("u1".into(), ReactionKind::Cry);
        assert!(!is_consistent(&post));

        let repaired = reconcile(&post);
        assert!(is_consistent(&repaired));
        assert_eq!(repaired.reaction_count(ReactionKind::Hearts), 0);
        assert_eq!(repaired.reaction_count(ReactionKind::Cry), 1);
        assert!(repaired.reactions.contains_key(&ReactionKind::Frowns));
    }

    proptest! {
        #[test]
        fn counts_always_match_user_map(
            steps in proptest::collection::vec((0usize..4, 0usize..ReactionKind::ALL.len()), 0..64)
        ) {
            let mut post = fresh_post();
            for (user, kind) in steps {
                post = apply_kind(&post, &format!("user-{user}"), ReactionKind::ALL[kind]);
                prop_assert!(is_consistent(&post));
            }
        }
    }
}
