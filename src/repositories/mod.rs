use crate::db_persistence::DbError;

pub type DbResult<T> = Result<T, DbError>;

pub mod identity;
