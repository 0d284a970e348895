use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (accounts, games, notifications)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                email           TEXT NOT NULL UNIQUE,
                password        TEXT,
                display_name    TEXT NOT NULL DEFAULT '',
                role            TEXT NOT NULL DEFAULT 'sender',
                provider        TEXT NOT NULL DEFAULT 'password',
                email_verified  INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE receiver_data (
                user_id     TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE receiver_links (
                sender_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                receiver_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                linked_at   TEXT NOT NULL,
                PRIMARY KEY (sender_id, receiver_id)
            );

            CREATE TABLE games (
                id                  TEXT PRIMARY KEY,
                owner_id            TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                game_type           TEXT NOT NULL,
                title               TEXT NOT NULL,
                questions           TEXT,
                pairs               TEXT,
                settings            TEXT NOT NULL DEFAULT 'null',
                has_reward          INTEGER NOT NULL DEFAULT 0,
                rewards             TEXT,
                is_completed        INTEGER NOT NULL DEFAULT 0,
                claimed_reward_id   TEXT,
                reward_fulfilled    INTEGER NOT NULL DEFAULT 0,
                completed_at        TEXT,
                created_at          TEXT NOT NULL,
                letter_id           TEXT,
                UNIQUE(owner_id, game_type)
            );

            CREATE TABLE viewed_rewards (
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                reward_key  TEXT NOT NULL,
                PRIMARY KEY (user_id, reward_key)
            );

            CREATE TABLE notifications (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                kind        TEXT NOT NULL,
                message     TEXT NOT NULL,
                read        INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_notifications_user
                ON notifications(user_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }
}
