use std::collections::BTreeSet;

use anyhow::Result;
use rusqlite::{Connection, Row};

use crate::Database;
use crate::models::{GameRow, NotificationRow, ReceiverDataRow, ReceiverLinkRow, UserRow};

const GAME_COLUMNS: &str = "id, owner_id, game_type, title, questions, pairs, settings, has_reward, \
     rewards, is_completed, claimed_reward_id, reward_fulfilled, completed_at, created_at, letter_id";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &UserRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, display_name, role, provider, email_verified, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    user.id,
                    user.email,
                    user.password,
                    user.display_name,
                    user.role,
                    user.provider,
                    user.email_verified,
                    user.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Insert or refresh an account created through Google sign-in.
    /// Google accounts are always verified.
    pub fn upsert_google_user(
        &self,
        id: &str,
        email: &str,
        display_name: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, display_name, role, provider, email_verified, created_at)
                 VALUES (?1, ?2, NULL, ?3, 'sender', 'google', 1, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    email = excluded.email,
                    display_name = CASE WHEN excluded.display_name = '' THEN users.display_name
                                        ELSE excluded.display_name END,
                    email_verified = 1",
                rusqlite::params![id, email, display_name, created_at],
            )?;
            Ok(())
        })
    }

    /// Returns false when the user does not exist.
    pub fn update_profile(
        &self,
        id: &str,
        display_name: Option<&str>,
        role: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                    display_name = COALESCE(?2, display_name),
                    role = COALESCE(?3, role)
                 WHERE id = ?1",
                rusqlite::params![id, display_name, role],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_email_verified(&self, id: &str, verified: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET email_verified = ?2 WHERE id = ?1",
                rusqlite::params![id, verified],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Receivers --

    pub fn get_receiver_data(&self, user_id: &str) -> Result<Option<ReceiverDataRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT user_id, name, email, updated_at FROM receiver_data WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(ReceiverDataRow {
                        user_id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Insert or replace the receiver details. Returns true when a new row was created.
    pub fn upsert_receiver_data(&self, row: &ReceiverDataRow) -> Result<bool> {
        self.with_conn(|conn| {
            let existed: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM receiver_data WHERE user_id = ?1)",
                [&row.user_id],
                |r| r.get(0),
            )?;
            conn.execute(
                "INSERT INTO receiver_data (user_id, name, email, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                    name = excluded.name, email = excluded.email, updated_at = excluded.updated_at",
                rusqlite::params![row.user_id, row.name, row.email, row.updated_at],
            )?;
            Ok(!existed)
        })
    }

    pub fn link_receiver(&self, link: &ReceiverLinkRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO receiver_links (sender_id, receiver_id, linked_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![link.sender_id, link.receiver_id, link.linked_at],
            )?;
            Ok(())
        })
    }

    pub fn is_linked_receiver(&self, sender_id: &str, receiver_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let linked = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM receiver_links WHERE sender_id = ?1 AND receiver_id = ?2)",
                [sender_id, receiver_id],
                |r| r.get(0),
            )?;
            Ok(linked)
        })
    }

    pub fn linked_receivers(&self, sender_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT receiver_id FROM receiver_links WHERE sender_id = ?1 ORDER BY linked_at ASC",
            )?;
            let ids = stmt
                .query_map([sender_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    // -- Games --

    pub fn list_games(&self, owner_id: &str) -> Result<Vec<GameRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {GAME_COLUMNS} FROM games WHERE owner_id = ?1 ORDER BY created_at ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_id], game_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_game(&self, owner_id: &str, game_id: &str) -> Result<Option<GameRow>> {
        self.with_conn(|conn| query_game(conn, owner_id, game_id))
    }

    /// Insert a game. When `replace` names another game of the owner, it is
    /// deleted in the same transaction so the one-game-per-type rule holds.
    pub fn insert_game(&self, game: &GameRow, replace: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            if let Some(other) = replace {
                tx.execute(
                    "DELETE FROM games WHERE owner_id = ?1 AND id = ?2",
                    [game.owner_id.as_str(), other],
                )?;
            }
            let sql = format!(
                "INSERT INTO games ({GAME_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
            );
            tx.execute(&sql, game_params(game).as_slice())?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Overwrite every column of an existing game. Returns false when it does not exist.
    pub fn update_game(&self, game: &GameRow, replace: Option<&str>) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            if let Some(other) = replace {
                tx.execute(
                    "DELETE FROM games WHERE owner_id = ?1 AND id = ?2 AND id != ?3",
                    [game.owner_id.as_str(), other, game.id.as_str()],
                )?;
            }
            // A type change starts the game over for the receiver
            let changed = tx.execute(
                "UPDATE games SET
                    is_completed = CASE WHEN game_type = ?3 THEN is_completed ELSE 0 END,
                    claimed_reward_id = CASE WHEN game_type = ?3 THEN claimed_reward_id ELSE NULL END,
                    reward_fulfilled = CASE WHEN game_type = ?3 THEN reward_fulfilled ELSE 0 END,
                    completed_at = CASE WHEN game_type = ?3 THEN completed_at ELSE NULL END,
                    game_type = ?3, title = ?4, questions = ?5, pairs = ?6, settings = ?7,
                    has_reward = ?8, rewards = ?9, letter_id = COALESCE(?10, letter_id)
                 WHERE id = ?1 AND owner_id = ?2",
                rusqlite::params![
                    game.id,
                    game.owner_id,
                    game.game_type,
                    game.title,
                    game.questions,
                    game.pairs,
                    game.settings,
                    game.has_reward,
                    game.rewards,
                    game.letter_id,
                ],
            )?;
            tx.commit()?;
            Ok(changed > 0)
        })
    }

    /// Mark a game completed unless it already is. Returns false when the
    /// game is missing or was completed first by someone else.
    pub fn complete_game(
        &self,
        owner_id: &str,
        game_id: &str,
        claimed_reward_id: Option<&str>,
        completed_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE games SET is_completed = 1, claimed_reward_id = ?3, completed_at = ?4
                 WHERE owner_id = ?1 AND id = ?2 AND is_completed = 0",
                rusqlite::params![owner_id, game_id, claimed_reward_id, completed_at],
            )?;
            Ok(changed > 0)
        })
    }

    /// Flag the claimed reward as delivered. Returns false if it already was.
    pub fn mark_reward_fulfilled(&self, owner_id: &str, game_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE games SET reward_fulfilled = 1
                 WHERE owner_id = ?1 AND id = ?2 AND is_completed = 1 AND reward_fulfilled = 0",
                [owner_id, game_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_game(&self, owner_id: &str, game_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM games WHERE owner_id = ?1 AND id = ?2",
                [owner_id, game_id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Viewed rewards --

    pub fn get_viewed_rewards(&self, user_id: &str) -> Result<BTreeSet<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT reward_key FROM viewed_rewards WHERE user_id = ?1")?;
            let keys = stmt
                .query_map([user_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<BTreeSet<_>, _>>()?;
            Ok(keys)
        })
    }

    /// Replace the whole set. The last writer wins.
    pub fn replace_viewed_rewards(&self, user_id: &str, keys: &BTreeSet<String>) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute("DELETE FROM viewed_rewards WHERE user_id = ?1", [user_id])?;
            {
                let mut stmt = tx
                    .prepare("INSERT INTO viewed_rewards (user_id, reward_key) VALUES (?1, ?2)")?;
                for key in keys {
                    stmt.execute([user_id, key.as_str()])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    // -- Notifications --

    pub fn insert_notification(&self, n: &NotificationRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, kind, message, read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![n.id, n.user_id, n.kind, n.message, n.read, n.created_at],
            )?;
            Ok(())
        })
    }

    /// Newest first.
    pub fn list_notifications(&self, user_id: &str) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, kind, message, read, created_at FROM notifications
                 WHERE user_id = ?1 ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(NotificationRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        kind: row.get(2)?,
                        message: row.get(3)?,
                        read: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn unread_notification_count(&self, user_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read = 0",
                [user_id],
                |r| r.get(0),
            )?;
            Ok(count as usize)
        })
    }

    pub fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND id = ?2",
                [user_id, id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
                [user_id],
            )?;
            Ok(changed)
        })
    }

    pub fn delete_notification(&self, user_id: &str, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM notifications WHERE user_id = ?1 AND id = ?2",
                [user_id, id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn clear_notifications(&self, user_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM notifications WHERE user_id = ?1", [user_id])?;
            Ok(changed)
        })
    }
}

/// True when `err` came from a UNIQUE or PRIMARY KEY constraint.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, email, password, display_name, role, provider, email_verified, created_at
         FROM users WHERE {column} = ?1"
    );
    conn.query_row(&sql, [value], |row| {
        Ok(UserRow {
            id: row.get(0)?,
            email: row.get(1)?,
            password: row.get(2)?,
            display_name: row.get(3)?,
            role: row.get(4)?,
            provider: row.get(5)?,
            email_verified: row.get(6)?,
            created_at: row.get(7)?,
        })
    })
    .optional()
}

fn query_game(conn: &Connection, owner_id: &str, game_id: &str) -> Result<Option<GameRow>> {
    let sql = format!("SELECT {GAME_COLUMNS} FROM games WHERE owner_id = ?1 AND id = ?2");
    conn.query_row(&sql, [owner_id, game_id], game_from_row).optional()
}

fn game_from_row(row: &Row<'_>) -> rusqlite::Result<GameRow> {
    Ok(GameRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        game_type: row.get(2)?,
        title: row.get(3)?,
        questions: row.get(4)?,
        pairs: row.get(5)?,
        settings: row.get(6)?,
        has_reward: row.get(7)?,
        rewards: row.get(8)?,
        is_completed: row.get(9)?,
        claimed_reward_id: row.get(10)?,
        reward_fulfilled: row.get(11)?,
        completed_at: row.get(12)?,
        created_at: row.get(13)?,
        letter_id: row.get(14)?,
    })
}

fn game_params(game: &GameRow) -> Vec<&dyn rusqlite::types::ToSql> {
    vec![
        &game.id,
        &game.owner_id,
        &game.game_type,
        &game.title,
        &game.questions,
        &game.pairs,
        &game.settings,
        &game.has_reward,
        &game.rewards,
        &game.is_completed,
        &game.claimed_reward_id,
        &game.reward_fulfilled,
        &game.completed_at,
        &game.created_at,
        &game.letter_id,
    ]
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dearly_types::models::{Game, GameType, Notification, NotificationKind};

    fn db_with_user(id: &str) -> Database {
        let db = Database::open_in_memory().unwrap();
        add_user(&db, id);
        db
    }

    fn add_user(db: &Database, id: &str) {
        db.create_user(&UserRow {
            id: id.into(),
            email: format!("{id}@example.com"),
            password: Some("hash".into()),
            display_name: id.into(),
            role: "sender".into(),
            provider: "password".into(),
            email_verified: false,
            created_at: Utc::now().to_rfc3339(),
        })
        .unwrap();
    }

    fn game(id: &str, game_type: GameType) -> Game {
        Game {
            id: id.into(),
            game_type,
            title: "title".into(),
            questions: None,
            pairs: None,
            settings: serde_json::Value::Null,
            has_reward: false,
            rewards: None,
            is_completed: false,
            claimed_reward_id: None,
            reward_fulfilled: false,
            completed_at: None,
            created_at: Utc::now(),
            letter_id: None,
        }
    }

    #[test]
    fn game_roundtrip_through_row() {
        let db = db_with_user("u1");
        let g = game("g1", GameType::Quiz);
        db.insert_game(&GameRow::from_game("u1", &g).unwrap(), None).unwrap();

        let loaded = db.get_game("u1", "g1").unwrap().unwrap().into_game().unwrap();
        assert_eq!(loaded, g);
        assert!(db.get_game("someone-else", "g1").unwrap().is_none());
    }

    #[test]
    fn second_game_of_same_type_violates_unique() {
        let db = db_with_user("u1");
        db.insert_game(&GameRow::from_game("u1", &game("g1", GameType::Quiz)).unwrap(), None)
            .unwrap();
        let err = db
            .insert_game(&GameRow::from_game("u1", &game("g2", GameType::Quiz)).unwrap(), None)
            .unwrap_err();
        assert!(is_unique_violation(&err));

        db.insert_game(&GameRow::from_game("u1", &game("g2", GameType::Quiz)).unwrap(), Some("g1"))
            .unwrap();
        let ids: Vec<String> = db.list_games("u1").unwrap().into_iter().map(|g| g.id).collect();
        assert_eq!(ids, vec!["g2".to_string()]);
    }

    #[test]
    fn update_with_replace_keeps_one_per_type() {
        let db = db_with_user("u1");
        db.insert_game(&GameRow::from_game("u1", &game("q", GameType::Quiz)).unwrap(), None)
            .unwrap();
        db.insert_game(&GameRow::from_game("u1", &game("m", GameType::MemoryMatch)).unwrap(), None)
            .unwrap();

        let converted = game("q", GameType::MemoryMatch);
        let row = GameRow::from_game("u1", &converted).unwrap();
        assert!(db.update_game(&row, None).is_err());
        assert!(db.update_game(&row, Some("m")).unwrap());

        let games = db.list_games("u1").unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].game_type, "memory-match");
    }

    #[test]
    fn completion_happens_once() {
        let db = db_with_user("u1");
        db.insert_game(&GameRow::from_game("u1", &game("g1", GameType::Quiz)).unwrap(), None)
            .unwrap();

        let at = Utc::now().to_rfc3339();
        assert!(db.complete_game("u1", "g1", Some("r1"), &at).unwrap());
        assert!(!db.complete_game("u1", "g1", Some("r2"), &at).unwrap());
        assert!(!db.complete_game("u1", "missing", None, &at).unwrap());

        let row = db.get_game("u1", "g1").unwrap().unwrap();
        assert!(row.is_completed);
        assert_eq!(row.claimed_reward_id.as_deref(), Some("r1"));

        assert!(db.mark_reward_fulfilled("u1", "g1").unwrap());
        assert!(!db.mark_reward_fulfilled("u1", "g1").unwrap());
    }

    #[test]
    fn content_update_keeps_completion() {
        let db = db_with_user("u1");
        db.insert_game(&GameRow::from_game("u1", &game("g1", GameType::Quiz)).unwrap(), None)
            .unwrap();
        let at = Utc::now().to_rfc3339();
        db.complete_game("u1", "g1", Some("r1"), &at).unwrap();

        // A stale copy read before completion must not undo it
        let mut edited = game("g1", GameType::Quiz);
        edited.title = "renamed".into();
        assert!(db.update_game(&GameRow::from_game("u1", &edited).unwrap(), None).unwrap());
        let row = db.get_game("u1", "g1").unwrap().unwrap();
        assert_eq!(row.title, "renamed");
        assert!(row.is_completed);
        assert_eq!(row.claimed_reward_id.as_deref(), Some("r1"));

        let converted = game("g1", GameType::MemoryMatch);
        db.update_game(&GameRow::from_game("u1", &converted).unwrap(), None).unwrap();
        let row = db.get_game("u1", "g1").unwrap().unwrap();
        assert!(!row.is_completed);
        assert!(row.claimed_reward_id.is_none());
        assert!(row.completed_at.is_none());
    }

    #[test]
    fn viewed_rewards_replace_whole_set() {
        let db = db_with_user("u1");
        let first = BTreeSet::from(["g1_a".to_string(), "g1_b".to_string()]);
        db.replace_viewed_rewards("u1", &first).unwrap();
        assert_eq!(db.get_viewed_rewards("u1").unwrap(), first);

        let second = BTreeSet::from(["g2_0".to_string()]);
        db.replace_viewed_rewards("u1", &second).unwrap();
        assert_eq!(db.get_viewed_rewards("u1").unwrap(), second);
    }

    #[test]
    fn notifications_read_and_clear() {
        let db = db_with_user("u1");
        for i in 0..3 {
            let kind = NotificationKind::LetterRead {
                letter_id: format!("l{i}"),
            };
            let n = Notification {
                id: format!("n{i}"),
                message: kind.format_message(),
                kind,
                read: false,
                created_at: Utc::now(),
            };
            db.insert_notification(&NotificationRow::from_notification("u1", &n).unwrap())
                .unwrap();
        }

        assert_eq!(db.unread_notification_count("u1").unwrap(), 3);
        assert!(db.mark_notification_read("u1", "n1").unwrap());
        assert!(!db.mark_notification_read("u1", "missing").unwrap());
        assert_eq!(db.unread_notification_count("u1").unwrap(), 2);
        assert_eq!(db.mark_all_notifications_read("u1").unwrap(), 2);
        assert!(db.delete_notification("u1", "n0").unwrap());
        assert_eq!(db.clear_notifications("u1").unwrap(), 2);
        assert!(db.list_notifications("u1").unwrap().is_empty());
    }

    #[test]
    fn google_upsert_marks_verified_and_keeps_name() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now().to_rfc3339();
        db.upsert_google_user("g-uid", "a@example.com", "Alex", &now).unwrap();
        db.upsert_google_user("g-uid", "a@example.com", "", &now).unwrap();
        let user = db.get_user_by_id("g-uid").unwrap().unwrap();
        assert_eq!(user.display_name, "Alex");
        assert!(user.email_verified);
        assert!(user.password.is_none());
    }

    #[test]
    fn receiver_links() {
        let db = db_with_user("sender");
        add_user(&db, "receiver");
        assert!(!db.is_linked_receiver("sender", "receiver").unwrap());
        let link = ReceiverLinkRow {
            sender_id: "sender".into(),
            receiver_id: "receiver".into(),
            linked_at: Utc::now().to_rfc3339(),
        };
        db.link_receiver(&link).unwrap();
        db.link_receiver(&link).unwrap();
        assert!(db.is_linked_receiver("sender", "receiver").unwrap());
        assert_eq!(db.linked_receivers("sender").unwrap(), vec!["receiver".to_string()]);
        assert!(db.linked_receivers("receiver").unwrap().is_empty());
    }
}
