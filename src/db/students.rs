use crate::db::models::{NewStudent, Student};
use crate::db::pool::{Backend, StorePool};
use crate::db::schema::{MYSQL_INIT, SQLITE_INIT};
use crate::error::StudentsError;
use sqlx::Row;
use tracing::debug;

const INSERT_STUDENT: &str = r#"
INSERT INTO students (
    name, email, phone, address, courses, id_number,
    emergency_contact_email, emergency_contact_phone
) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;

#[derive(Clone)]
pub struct StudentsStorage {
    pool: StorePool,
}

impl StudentsStorage {
    pub fn new(pool: StorePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &StorePool {
        &self.pool
    }

    /// Create the `students` table if it is missing, using the dialect of the
    /// configured backend.
    pub async fn init_schema(&self) -> Result<(), StudentsError> {
        let ddl = match self.pool.backend() {
            Backend::MySql => MYSQL_INIT,
            Backend::Sqlite => SQLITE_INIT,
        };
        let mut conn = self.pool.acquire().await?;
        sqlx::query(ddl.trim()).execute(&mut *conn).await?;
        Ok(())
    }

    /// All rows in insertion order.
    pub async fn list(&self) -> Result<Vec<Student>, StudentsError> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, Student>(
            r#"SELECT id, name, email, phone, address, courses, id_number,
               emergency_contact_email, emergency_contact_phone
               FROM students ORDER BY id"#,
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// Insert after the presence check. Returns the store-generated id.
    pub async fn insert(&self, student: &NewStudent) -> Result<i64, StudentsError> {
        let required = student.required()?;

        // The SQLite `Any` driver never reports `last_insert_id`, so SQLite
        // reads the id back through `RETURNING` in the same statement.
        let sql = match self.pool.backend() {
            Backend::MySql => INSERT_STUDENT.to_string(),
            Backend::Sqlite => format!("{} RETURNING id", INSERT_STUDENT.trim_end()),
        };
        let query = sqlx::query(&sql)
            .bind(required.name)
            .bind(required.email)
            .bind(student.phone.as_deref())
            .bind(student.address.as_deref())
            .bind(student.courses.as_deref())
            .bind(required.id_number)
            .bind(student.emergency_contact_email.as_deref())
            .bind(student.emergency_contact_phone.as_deref());

        let mut conn = self.pool.acquire().await?;
        match self.pool.backend() {
            Backend::MySql => {
                let result = query.execute(&mut *conn).await?;
                result.last_insert_id().ok_or(StudentsError::MissingInsertId)
            }
            Backend::Sqlite => {
                // Step to completion so the autocommit lands before the
                // connection goes back to the pool.
                let rows = query.fetch_all(&mut *conn).await?;
                let row = rows.first().ok_or(StudentsError::MissingInsertId)?;
                Ok(row.try_get::<i64, _>(0)?)
            }
        }
    }

    /// Delete by primary key. A missing row is not an error; the affected-row
    /// count is returned for callers that care.
    pub async fn delete(&self, id: i64) -> Result<u64, StudentsError> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        let affected = result.rows_affected();
        debug!(id, affected, "delete executed");
        Ok(affected)
    }

    /// Cheapest round trip that proves the store is reachable.
    pub async fn ping(&self) -> Result<(), StudentsError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("SELECT 1").execute(&mut *conn).await?;
        Ok(())
    }
}
