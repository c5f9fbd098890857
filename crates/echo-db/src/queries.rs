use std::collections::HashMap;

use anyhow::Result;
use echo_types::models::{Group, GroupMessage, Millis, Post, Reply};
use rusqlite::{Connection, params};
use tracing::debug;
use uuid::Uuid;

use crate::Database;
use crate::models::{GroupRow, MessageRow, PostRow, ReplyRow};

const POST_COLUMNS: &str =
    "id, content, timestamp, category, reactions, user_reactions";
const GROUP_COLUMNS: &str =
    "id, name, category, description, created_at, last_message_time";
const MESSAGE_COLUMNS: &str = "id, group_id, text, sender, timestamp, reply_to, reactions, \
     voice_note_url, profile_emoji";

impl Database {
    // -- Posts --

    pub fn insert_post(&self, post: &Post) -> Result<()> {
        let reactions = serde_json::to_string(&post.reactions)?;
        let user_reactions = serde_json::to_string(&post.user_reactions)?;
        let category = post.category.as_ref().map(|c| c.as_str().to_string());

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, content, timestamp, category, reactions, user_reactions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    post.id.to_string(),
                    post.content,
                    post.timestamp,
                    category,
                    reactions,
                    user_reactions
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        self.with_conn(|conn| load_post(conn, id))
    }

    /// Every post with its replies, in storage order.
    pub fn list_posts(&self) -> Result<Vec<Post>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {POST_COLUMNS} FROM posts");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_post_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            // Group replies by post in one pass instead of a query per post
            let mut replies_by_post: HashMap<String, Vec<Reply>> = HashMap::new();
            for reply in query_replies(conn, None)? {
                let post_id = reply.post_id.clone();
                replies_by_post
                    .entry(post_id)
                    .or_default()
                    .push(reply.into_reply()?);
            }

            rows.into_iter()
                .map(|row| {
                    let replies = replies_by_post.remove(&row.id).unwrap_or_default();
                    row.into_post(replies)
                })
                .collect()
        })
    }

    /// Read a post, pass it through `apply` and store the reactions it
    /// returns, all in one transaction under the connection lock. `None`
    /// means the post does not exist. If `apply` rejects the change nothing
    /// is written and its error comes back as the inner `Err`.
    pub fn update_post_reactions<F, E>(
        &self,
        id: Uuid,
        apply: F,
    ) -> Result<Option<std::result::Result<Post, E>>>
    where
        F: FnOnce(&Post) -> std::result::Result<Post, E>,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(current) = load_post(&tx, id)? else {
                return Ok(None);
            };
            let updated = match apply(&current) {
                Ok(post) => post,
                Err(e) => return Ok(Some(Err(e))),
            };

            tx.execute(
                "UPDATE posts SET reactions = ?1, user_reactions = ?2 WHERE id = ?3",
                params![
                    serde_json::to_string(&updated.reactions)?,
                    serde_json::to_string(&updated.user_reactions)?,
                    id.to_string()
                ],
            )?;
            tx.commit()?;
            Ok(Some(Ok(updated)))
        })
    }

    // -- Replies --

    /// Append a reply. Returns false if the post does not exist.
    pub fn insert_reply(&self, post_id: Uuid, reply: &Reply) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "INSERT INTO replies (id, post_id, content, timestamp, user_id)
                 SELECT ?1, ?2, ?3, ?4, ?5
                 WHERE EXISTS (SELECT 1 FROM posts WHERE id = ?2)",
                params![
                    reply.id.to_string(),
                    post_id.to_string(),
                    reply.content,
                    reply.timestamp,
                    reply.user_id
                ],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Groups --

    pub fn insert_group(&self, group: &Group) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO chat_groups (id, name, category, description, created_at, last_message_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    group.id.to_string(),
                    group.name,
                    group.category,
                    group.description,
                    group.created_at,
                    group.last_message_time
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_group(&self, id: Uuid) -> Result<Option<Group>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {GROUP_COLUMNS} FROM chat_groups WHERE id = ?1");
            conn.query_row(&sql, [id.to_string()], map_group_row)
                .optional()?
                .map(GroupRow::into_group)
                .transpose()
        })
    }

    pub fn list_groups(&self) -> Result<Vec<Group>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {GROUP_COLUMNS} FROM chat_groups ORDER BY created_at, id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_group_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(GroupRow::into_group).collect()
        })
    }

    /// Delete the given groups, but only those whose last activity is still
    /// before `cutoff` at delete time. A message that landed after the
    /// caller's snapshot keeps its group; a group some other sweep already
    /// removed is skipped without error. Returns the ids actually deleted.
    pub fn delete_stale_groups(&self, ids: &[Uuid], cutoff: Millis) -> Result<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut deleted = Vec::new();
            {
                let mut stmt = tx.prepare(
                    "DELETE FROM chat_groups
                     WHERE id = ?1 AND COALESCE(last_message_time, created_at) < ?2",
                )?;
                for id in ids {
                    if stmt.execute(params![id.to_string(), cutoff])? == 1 {
                        deleted.push(*id);
                    }
                }
            }
            tx.commit()?;

            debug!("Deleted {} of {} stale groups", deleted.len(), ids.len());
            Ok(deleted)
        })
    }

    // -- Group messages --

    /// Insert a message and bump its group's `last_message_time` in one
    /// transaction. Returns false if the group does not exist.
    pub fn insert_group_message(&self, message: &GroupMessage) -> Result<bool> {
        let reactions = serde_json::to_string(&message.reactions)?;
        let reply_to = message
            .reply_to
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let touched = tx.execute(
                "UPDATE chat_groups SET last_message_time = ?1 WHERE id = ?2",
                params![message.timestamp, message.group_id.to_string()],
            )?;
            if touched == 0 {
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO group_messages
                    (id, group_id, text, sender, timestamp, reply_to, reactions, voice_note_url, profile_emoji)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    message.id.to_string(),
                    message.group_id.to_string(),
                    message.text,
                    message.sender,
                    message.timestamp,
                    reply_to,
                    reactions,
                    message.voice_note_url,
                    message.profile_emoji
                ],
            )?;
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn get_group_message(
        &self,
        group_id: Uuid,
        message_id: Uuid,
    ) -> Result<Option<GroupMessage>> {
        self.with_conn(|conn| load_message(conn, group_id, message_id))
    }

    pub fn list_group_messages(&self, group_id: Uuid) -> Result<Vec<GroupMessage>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM group_messages
                 WHERE group_id = ?1
                 ORDER BY timestamp, id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([group_id.to_string()], map_message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter()
                .map(MessageRow::into_message)
                .collect()
        })
    }

    /// Transactional read-modify-write of a message's reaction sets, shaped
    /// like [`Database::update_post_reactions`]. `apply` may hand back an
    /// extra value alongside the updated message.
    pub fn update_message_reactions<F, T, E>(
        &self,
        group_id: Uuid,
        message_id: Uuid,
        apply: F,
    ) -> Result<Option<std::result::Result<(GroupMessage, T), E>>>
    where
        F: FnOnce(&GroupMessage) -> std::result::Result<(GroupMessage, T), E>,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(current) = load_message(&tx, group_id, message_id)? else {
                return Ok(None);
            };
            let (updated, extra) = match apply(&current) {
                Ok(outcome) => outcome,
                Err(e) => return Ok(Some(Err(e))),
            };

            tx.execute(
                "UPDATE group_messages SET reactions = ?1 WHERE id = ?2 AND group_id = ?3",
                params![
                    serde_json::to_string(&updated.reactions)?,
                    message_id.to_string(),
                    group_id.to_string()
                ],
            )?;
            tx.commit()?;
            Ok(Some(Ok((updated, extra))))
        })
    }

    /// Returns false if there was nothing to delete.
    pub fn delete_group_message(&self, group_id: Uuid, message_id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM group_messages WHERE id = ?1 AND group_id = ?2",
                [message_id.to_string(), group_id.to_string()],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Chat sessions --

    /// Record that `user_id` opened `session_id` in a group. Returns false if
    /// the group does not exist.
    pub fn insert_chat_session(
        &self,
        session_id: &str,
        group_id: Uuid,
        user_id: &str,
        now: Millis,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "INSERT INTO chat_sessions (id, group_id, user_id, created_at)
                 SELECT ?1, ?2, ?3, ?4
                 WHERE EXISTS (SELECT 1 FROM chat_groups WHERE id = ?2)",
                params![session_id, group_id.to_string(), user_id, now],
            )?;
            Ok(changed == 1)
        })
    }

    /// The identity that opened `session_id` in this group, if any.
    pub fn chat_session_owner(&self, group_id: Uuid, session_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT user_id FROM chat_sessions WHERE id = ?1 AND group_id = ?2",
                params![session_id, group_id.to_string()],
                |row| row.get(0),
            )
            .optional()
        })
    }
}

fn load_post(conn: &Connection, id: Uuid) -> Result<Option<Post>> {
    let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1");
    let row = conn
        .query_row(&sql, [id.to_string()], map_post_row)
        .optional()?;

    match row {
        Some(row) => {
            let replies = query_replies(conn, Some(&row.id))?
                .into_iter()
                .map(ReplyRow::into_reply)
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(row.into_post(replies)?))
        }
        None => Ok(None),
    }
}

fn load_message(conn: &Connection, group_id: Uuid, message_id: Uuid) -> Result<Option<GroupMessage>> {
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM group_messages WHERE id = ?1 AND group_id = ?2");
    conn.query_row(
        &sql,
        [message_id.to_string(), group_id.to_string()],
        map_message_row,
    )
    .optional()?
    .map(MessageRow::into_message)
    .transpose()
}

fn map_post_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        content: row.get(1)?,
        timestamp: row.get(2)?,
        category: row.get(3)?,
        reactions: row.get(4)?,
        user_reactions: row.get(5)?,
    })
}

fn map_group_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
        last_message_time: row.get(5)?,
    })
}

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        group_id: row.get(1)?,
        text: row.get(2)?,
        sender: row.get(3)?,
        timestamp: row.get(4)?,
        reply_to: row.get(5)?,
        reactions: row.get(6)?,
        voice_note_url: row.get(7)?,
        profile_emoji: row.get(8)?,
    })
}

fn map_reply_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReplyRow> {
    Ok(ReplyRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        content: row.get(2)?,
        timestamp: row.get(3)?,
        user_id: row.get(4)?,
    })
}

/// Replies of one post, or of every post when `post_id` is `None`,
/// oldest first.
fn query_replies(conn: &Connection, post_id: Option<&str>) -> Result<Vec<ReplyRow>> {
    let rows = match post_id {
        Some(post_id) => {
            let mut stmt = conn.prepare(
                "SELECT id, post_id, content, timestamp, user_id FROM replies
                 WHERE post_id = ?1
                 ORDER BY timestamp, rowid",
            )?;
            stmt.query_map([post_id], map_reply_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT id, post_id, content, timestamp, user_id FROM replies
                 ORDER BY timestamp, rowid",
            )?;
            stmt.query_map([], map_reply_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
