//! Data access behind the HTTP layer.
//!
//! Handlers only see these traits; `PgStore` backs them with PostgreSQL and
//! `MemoryStore` keeps everything in process for development and tests.

pub mod address;
pub mod memory;
pub mod student;
pub mod user;

use async_trait::async_trait;

use crate::err::Error;
use crate::models::{NewAddress, NewStudent, Page, PageRequest, Role, Student, User};

pub use memory::MemoryStore;

#[async_trait]
pub trait StudentService: Send + Sync {
    async fn list(&self, page: PageRequest) -> Result<Page<Student>, Error>;

    /// Case-insensitive substring match on name, father_name, mother_name
    /// and parents_occupation.
    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Student>, Error>;

    async fn get(&self, id: i64) -> Result<Option<Student>, Error>;

    async fn exists(&self, id: i64) -> Result<bool, Error>;

    async fn create(&self, student: NewStudent) -> Result<i64, Error>;

    async fn update(&self, id: i64, student: NewStudent) -> Result<bool, Error>;

    async fn delete(&self, id: i64) -> Result<bool, Error>;

    async fn update_photo(&self, id: i64, url: &str) -> Result<bool, Error>;
}

#[async_trait]
pub trait AddressService: Send + Sync {
    async fn create(&self, address: NewAddress) -> Result<i64, Error>;

    async fn update(&self, id: i64, address: NewAddress) -> Result<bool, Error>;

    async fn delete(&self, id: i64) -> Result<bool, Error>;
}

#[async_trait]
pub trait UserService: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error>;

    async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<i64, Error>;
}

/// Escapes `%`, `_` and `\` so a user query matches literally inside ILIKE.
pub fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ko"), "%ko%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
