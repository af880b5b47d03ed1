//! Database module: pool, models and repository for the `students` table.
//!
//! Layout:
//! - `pool.rs`: bounded `Any` pool with scoped connection checkout
//! - `models.rs`: row and payload structs
//! - `schema.rs`: bootstrap DDL per backend
//! - `students.rs`: list / insert / delete / ping

pub mod models;
pub mod pool;
pub mod schema;
pub mod students;

pub use models::{NewStudent, Student};
pub use pool::{Backend, PoolSettings, StoreConn, StorePool};
pub use schema::{MYSQL_INIT, SQLITE_INIT};
pub use students::StudentsStorage;
