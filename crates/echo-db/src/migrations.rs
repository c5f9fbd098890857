use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS posts (
            id              TEXT PRIMARY KEY,
            content         TEXT NOT NULL,
            timestamp       INTEGER NOT NULL,
            category        TEXT,
            reactions       TEXT NOT NULL DEFAULT '{}',
            user_reactions  TEXT NOT NULL DEFAULT '{}'
        );

        CREATE INDEX IF NOT EXISTS idx_posts_timestamp
            ON posts(timestamp);

        CREATE INDEX IF NOT EXISTS idx_posts_category
            ON posts(category);

        CREATE TABLE IF NOT EXISTS replies (
            id          TEXT PRIMARY KEY,
            post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            content     TEXT NOT NULL,
            timestamp   INTEGER NOT NULL,
            user_id     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_replies_post
            ON replies(post_id, timestamp);

        -- Both timestamps nullable: legacy records may lack either
        CREATE TABLE IF NOT EXISTS chat_groups (
            id                  TEXT PRIMARY KEY,
            name                TEXT NOT NULL,
            category            TEXT NOT NULL,
            description         TEXT NOT NULL,
            created_at          INTEGER,
            last_message_time   INTEGER
        );

        CREATE TABLE IF NOT EXISTS group_messages (
            id              TEXT PRIMARY KEY,
            group_id        TEXT NOT NULL REFERENCES chat_groups(id) ON DELETE CASCADE,
            text            TEXT NOT NULL,
            sender          TEXT NOT NULL,
            timestamp       INTEGER NOT NULL,
            reply_to        TEXT,
            reactions       TEXT NOT NULL DEFAULT '{}',
            voice_note_url  TEXT,
            profile_emoji   TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_group_messages_group
            ON group_messages(group_id, timestamp);

        -- Chat sessions belong to the identity that opened them
        CREATE TABLE IF NOT EXISTS chat_sessions (
            id          TEXT PRIMARY KEY,
            group_id    TEXT NOT NULL REFERENCES chat_groups(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL,
            created_at  INTEGER NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
