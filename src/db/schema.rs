//! SQL DDL for bootstrapping the `students` table.
//! One statement per backend; the column set is shared.

/// MySQL schema:
/// - `id` BIGINT AUTO_INCREMENT primary key
/// - `name`, `email`, `id_number` required
/// - remaining contact/course fields nullable
pub const MYSQL_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS students (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    email VARCHAR(255) NOT NULL,
    phone VARCHAR(64) NULL,
    address VARCHAR(512) NULL,
    courses VARCHAR(1024) NULL,
    id_number VARCHAR(64) NOT NULL,
    emergency_contact_email VARCHAR(255) NULL,
    emergency_contact_phone VARCHAR(64) NULL
)
"#;

/// SQLite schema used for local runs and tests.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS students (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone TEXT NULL,
    address TEXT NULL,
    courses TEXT NULL,
    id_number TEXT NOT NULL,
    emergency_contact_email TEXT NULL,
    emergency_contact_phone TEXT NULL
)
"#;
