use {
    std::{path::Path, sync::{Arc, Mutex}},
    rusqlite::{Connection, ErrorCode, OptionalExtension, params},
    rusqlite_migration::{Migrations, M},
    thiserror::Error,
    tracing::warn,
};

pub type UserId = i64;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("failed to open database connection: {reason}")]
    ConnectionOpen { reason: String },

    #[error("failed to acquire database connection")]
    ConnectionAcquire,

    #[error("failed to run query: {reason}")]
    QueryRun { reason: String },

    #[error("failed to start transaction: {reason}")]
    TransactionStart { reason: String },

    #[error("sql migration failed: {reason}")]
    MigrationFailed { reason: String },

    #[error("username already taken")]
    UsernameTaken,
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        Self::QueryRun { reason: err.to_string() }
    }
}

fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up("create table users (
            id integer primary key autoincrement,
            username text not null unique,
            hash text not null,
            blocks integer not null default 0,
            bpc integer not null default 1,
            bps real not null default 1.0
        )"),
        M::up("create table upgrades (
            user_id integer not null references users (id),
            type text not null,
            level integer not null default 0,
            primary key (user_id, type)
        )"),
        M::up("create table sessions (
            token text primary key,
            user_id integer references users (id)
        );
        create table flashes (
            id integer primary key autoincrement,
            token text not null references sessions (token) on delete cascade,
            message text not null
        );"),
        M::up("alter table sessions add column created_at integer not null default 0;
        create index sessions_created_at on sessions (created_at);"),
    ])
}

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        Self::from_connection(
            Connection::open(path).map_err(|err| DatabaseError::ConnectionOpen { reason: err.to_string() })?
        )
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(
            Connection::open_in_memory().map_err(|err| DatabaseError::ConnectionOpen { reason: err.to_string() })?
        )
    }

    fn from_connection(connection: Connection) -> Result<Self, DatabaseError> {
        connection.pragma_update(None, "foreign_keys", true)
            .map_err(|err| DatabaseError::ConnectionOpen { reason: err.to_string() })?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }

    pub fn run_migrations(&self) -> Result<(), DatabaseError> {
        self.with_connection(|connection| {
            migrations().to_latest(connection)
                .map_err(|err| DatabaseError::MigrationFailed { reason: err.to_string() })
        })
    }

    fn with_connection<T, E: From<DatabaseError>>(&self, f: impl FnOnce(&mut Connection) -> Result<T, E>) -> Result<T, E> {
        let mut connection = self.connection.lock().map_err(|_| DatabaseError::ConnectionAcquire)?;
        f(&mut *connection)
    }
}

pub mod users {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub struct User {
        pub id: UserId,
        pub username: String,
        pub hash: String,
        pub blocks: i64,
        pub bpc: i64,
        pub bps: f64,
    }

    const USER_COLUMNS: &str = "id, username, hash, blocks, bpc, bps";

    fn read_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            hash: row.get(2)?,
            blocks: row.get(3)?,
            bpc: row.get(4)?,
            bps: row.get(5)?,
        })
    }

    impl Database {
        pub fn create_user(&self, username: &str, hash: &str) -> Result<UserId, DatabaseError> {
            self.with_connection(|connection| {
                match connection.execute("insert into users (username, hash) values (?1, ?2)", params![username, hash]) {
                    Ok(_) => Ok(connection.last_insert_rowid()),
                    Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
                        Err(DatabaseError::UsernameTaken)
                    },
                    Err(err) => Err(err.into()),
                }
            })
        }

        pub fn user(&self, id: UserId) -> Result<Option<User>, DatabaseError> {
            self.with_connection(|connection| {
                Ok(connection.query_row(&format!("select {USER_COLUMNS} from users where id = ?1"), [id], read_user).optional()?)
            })
        }

        pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
            self.with_connection(|connection| {
                Ok(connection.query_row(&format!("select {USER_COLUMNS} from users where username = ?1"), [username], read_user).optional()?)
            })
        }
    }
}

pub mod mine {
    use super::*;

    impl Database {
        /// Adds the user's blocks-per-click to their total. `None` if the user does not exist.
        pub fn mine(&self, user_id: UserId) -> Result<Option<i64>, DatabaseError> {
            self.with_connection(|connection| {
                Ok(connection.query_row(
                    "update users set blocks = blocks + bpc where id = ?1 returning blocks",
                    [user_id],
                    |row| row.get(0),
                ).optional()?)
            })
        }
    }
}

pub mod upgrades {
    use {
        super::*,
        std::collections::HashMap,
        clicker_core::{UpgradeEffect, UpgradeKind, UpgradeResponse},
    };

    #[derive(Error, Debug)]
    pub enum UpgradeError {
        #[error("not enough blocks: {blocks} available, {cost} required")]
        NotEnoughBlocks { blocks: i64, cost: i64 },

        #[error("user not found")]
        UserNotFound,

        #[error(transparent)]
        Database(#[from] DatabaseError),
    }

    impl From<rusqlite::Error> for UpgradeError {
        fn from(err: rusqlite::Error) -> Self {
            Self::Database(err.into())
        }
    }

    impl Database {
        pub fn purchase_upgrade(&self, user_id: UserId, kind: UpgradeKind) -> Result<UpgradeResponse, UpgradeError> {
            self.with_connection(|connection| {
                let txn = connection.transaction()
                    .map_err(|err| DatabaseError::TransactionStart { reason: err.to_string() })?;

                let blocks: i64 = txn.query_row("select blocks from users where id = ?1", [user_id], |row| row.get(0))
                    .optional()?
                    .ok_or(UpgradeError::UserNotFound)?;
                let level: u32 = txn.query_row(
                    "select level from upgrades where user_id = ?1 and type = ?2",
                    params![user_id, kind.name()],
                    |row| row.get(0),
                ).optional()?.unwrap_or(0);

                let upgrade = kind.upgrade();
                let cost = upgrade.cost_at(level);
                if blocks < cost {
                    // dropping the transaction rolls it back
                    return Err(UpgradeError::NotEnoughBlocks { blocks, cost });
                }

                txn.execute("update users set blocks = blocks - ?1 where id = ?2", params![cost, user_id])?;
                txn.execute(
                    "insert into upgrades (user_id, type, level) values (?1, ?2, 1)
                        on conflict (user_id, type) do update set level = level + 1",
                    params![user_id, kind.name()],
                )?;
                match upgrade.effect {
                    UpgradeEffect::Bpc => txn.execute("update users set bpc = bpc + 1 where id = ?1", [user_id])?,
                    UpgradeEffect::Bps => txn.execute("update users set bps = bps * ?1 where id = ?2", params![upgrade.multiplier, user_id])?,
                };

                let (blocks, bpc, bps): (i64, i64, f64) = txn.query_row(
                    "select blocks, bpc, bps from users where id = ?1",
                    [user_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )?;
                txn.commit()?;

                let level = level + 1;
                Ok(UpgradeResponse {
                    blocks,
                    bpc,
                    bps,
                    level,
                    next_cost: upgrade.cost_at(level),
                })
            })
        }

        pub fn upgrade_levels(&self, user_id: UserId) -> Result<HashMap<UpgradeKind, u32>, DatabaseError> {
            self.with_connection(|connection| {
                let mut stmt = connection.prepare("select type, level from upgrades where user_id = ?1")?;
                let rows = stmt.query_map([user_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)))?;

                let mut levels = HashMap::new();
                for row in rows {
                    let (name, level) = row?;
                    match name.parse::<UpgradeKind>() {
                        Ok(kind) => { levels.insert(kind, level); },
                        Err(err) => warn!("skipping stored upgrade for user {user_id}: {err}"),
                    }
                }
                Ok(levels)
            })
        }
    }
}

pub mod leaderboard {
    use super::*;

    #[derive(Debug, Clone, Eq, PartialEq)]
    pub struct LeaderboardEntry {
        pub username: String,
        pub blocks: i64,
    }

    impl Database {
        pub fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, DatabaseError> {
            self.with_connection(|connection| {
                let mut stmt = connection.prepare("select username, blocks from users order by blocks desc, id asc")?;
                let entries = stmt.query_map([], |row| Ok(LeaderboardEntry { username: row.get(0)?, blocks: row.get(1)? }))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
        }
    }
}

pub mod sessions {
    use super::*;

    /// Sessions bound to a user are valid for this long after login.
    pub const SESSION_TTL_SECS: i64 = 31 * 24 * 60 * 60;
    /// Anonymous sessions only carry flash messages to the next page.
    pub const ANONYMOUS_SESSION_TTL_SECS: i64 = 10 * 60;
    /// Oldest anonymous sessions are evicted past this many.
    pub const MAX_ANONYMOUS_SESSIONS: i64 = 256;

    #[derive(Debug, Clone, Eq, PartialEq)]
    pub struct SessionRecord {
        pub token: String,
        pub user_id: Option<UserId>,
    }

    fn new_token() -> String {
        hex::encode(rand::random::<[u8; 32]>())
    }

    impl Database {
        /// Starts a session and sweeps expired ones. A new anonymous session evicts the oldest
        /// anonymous ones over `MAX_ANONYMOUS_SESSIONS`.
        pub fn create_session(&self, user_id: Option<UserId>) -> Result<SessionRecord, DatabaseError> {
            let token = new_token();
            self.with_connection(|connection| {
                let txn = connection.transaction()
                    .map_err(|err| DatabaseError::TransactionStart { reason: err.to_string() })?;
                txn.execute(
                    "delete from sessions
                    where created_at <= unixepoch() - case when user_id is null then ?1 else ?2 end",
                    params![ANONYMOUS_SESSION_TTL_SECS, SESSION_TTL_SECS],
                )?;
                if user_id.is_none() {
                    let evicted = txn.execute(
                        "delete from sessions where user_id is null and token not in (
                            select token from sessions where user_id is null
                            order by created_at desc, rowid desc limit ?1
                        )",
                        [MAX_ANONYMOUS_SESSIONS - 1],
                    )?;
                    if evicted > 0 {
                        warn!("evicted {evicted} anonymous sessions");
                    }
                }
                txn.execute(
                    "insert into sessions (token, user_id, created_at) values (?1, ?2, unixepoch())",
                    params![token, user_id],
                )?;
                txn.commit()?;
                Ok::<_, DatabaseError>(())
            })?;
            Ok(SessionRecord { token, user_id })
        }

        /// Expired sessions read as missing.
        pub fn session(&self, token: &str) -> Result<Option<SessionRecord>, DatabaseError> {
            self.with_connection(|connection| {
                Ok(connection.query_row(
                    "select token, user_id from sessions
                    where token = ?1 and created_at > unixepoch() - case when user_id is null then ?2 else ?3 end",
                    params![token, ANONYMOUS_SESSION_TTL_SECS, SESSION_TTL_SECS],
                    |row| Ok(SessionRecord { token: row.get(0)?, user_id: row.get(1)? }),
                ).optional()?)
            })
        }

        /// Removes the session along with its pending flash messages.
        pub fn delete_session(&self, token: &str) -> Result<(), DatabaseError> {
            self.with_connection(|connection| {
                connection.execute("delete from sessions where token = ?1", [token])?;
                Ok(())
            })
        }

        pub fn push_flash(&self, token: &str, message: &str) -> Result<(), DatabaseError> {
            self.with_connection(|connection| {
                connection.execute("insert into flashes (token, message) values (?1, ?2)", params![token, message])?;
                Ok(())
            })
        }

        /// Pending flash messages in the order they were pushed. Each message is returned once.
        /// An anonymous session has nothing left to carry afterwards and is removed.
        pub fn take_flashes(&self, token: &str) -> Result<Vec<String>, DatabaseError> {
            self.with_connection(|connection| {
                let txn = connection.transaction()
                    .map_err(|err| DatabaseError::TransactionStart { reason: err.to_string() })?;
                let messages = {
                    let mut stmt = txn.prepare("select message from flashes where token = ?1 order by id")?;
                    stmt.query_map([token], |row| row.get(0))?.collect::<Result<Vec<String>, _>>()?
                };
                txn.execute("delete from flashes where token = ?1", [token])?;
                txn.execute("delete from sessions where token = ?1 and user_id is null", [token])?;
                txn.commit()?;
                Ok(messages)
            })
        }
    }
}
