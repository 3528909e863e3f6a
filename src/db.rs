use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use log::info;
use thiserror::Error;

const SCHEMA: &str = include_str!("schema.sql");

/// Ids bound per `IN (...)` query, under SQLite's bound-parameter cap.
pub const ID_CHUNK: usize = 500;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Error connecting to {url}: {source}")]
    Connection {
        url: String,
        source: diesel::ConnectionError,
    },

    #[error("Database error: {0}")]
    Query(#[from] diesel::result::Error),
}

/// Opens the database named by `database_url` and makes sure the schema
/// exists. The connection is owned by the caller and passed explicitly to
/// every loader; nothing holds on to it globally.
pub fn establish_connection(database_url: &str) -> Result<SqliteConnection, DatabaseError> {
    let mut connection =
        SqliteConnection::establish(database_url).map_err(|source| DatabaseError::Connection {
            url: database_url.to_string(),
            source,
        })?;
    initialize(&mut connection)?;
    info!("Connected to {}", database_url);
    Ok(connection)
}

pub fn initialize(connection: &mut SqliteConnection) -> Result<(), DatabaseError> {
    connection.batch_execute("PRAGMA foreign_keys = ON;")?;
    connection.batch_execute(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_connection() -> SqliteConnection {
    establish_connection(":memory:").expect("in-memory database")
}
