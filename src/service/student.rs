use async_trait::async_trait;

use crate::db::PgStore;
use crate::err::Error;
use crate::models::{NewStudent, Page, PageRequest, Student, StudentRow};
use crate::service::{like_pattern, StudentService};

const SELECT_STUDENT: &str = "SELECT s.id, s.name, s.deactivated_at, s.birth_date, s.father_name, \
    s.mother_name, s.parents_occupation, s.photo, s.created_at, s.updated_at, \
    a.id AS address_id, a.division, a.district, a.township, a.street_address, \
    a.type AS address_type, a.created_at AS address_created_at, a.updated_at AS address_updated_at \
    FROM students s JOIN addresses a ON a.id = s.address_id";

const SEARCH_CONDITION: &str = "s.name ILIKE $1 OR s.father_name ILIKE $1 \
    OR s.mother_name ILIKE $1 OR s.parents_occupation ILIKE $1";

#[async_trait]
impl StudentService for PgStore {
    async fn list(&self, page: PageRequest) -> Result<Page<Student>, Error> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, StudentRow>(&format!(
            "{} ORDER BY s.id LIMIT $1 OFFSET $2",
            SELECT_STUDENT
        ))
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Student::from).collect(),
            page,
            total,
        ))
    }

    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Student>, Error> {
        let pattern = like_pattern(query);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM students s WHERE {}",
            SEARCH_CONDITION
        ))
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, StudentRow>(&format!(
            "{} WHERE {} ORDER BY s.id LIMIT $2 OFFSET $3",
            SELECT_STUDENT, SEARCH_CONDITION
        ))
        .bind(&pattern)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Student::from).collect(),
            page,
            total,
        ))
    }

    async fn get(&self, id: i64) -> Result<Option<Student>, Error> {
        let row = sqlx::query_as::<_, StudentRow>(&format!("{} WHERE s.id = $1", SELECT_STUDENT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Student::from))
    }

    async fn exists(&self, id: i64) -> Result<bool, Error> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM students WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn create(&self, student: NewStudent) -> Result<i64, Error> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO students (name, deactivated_at, birth_date, father_name, mother_name, \
             parents_occupation, photo, address_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, LOCALTIMESTAMP, LOCALTIMESTAMP) RETURNING id",
        )
        .bind(&student.name)
        .bind(student.deactivated_at)
        .bind(student.birth_date)
        .bind(&student.father_name)
        .bind(&student.mother_name)
        .bind(&student.parents_occupation)
        .bind(&student.photo)
        .bind(student.address_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update(&self, id: i64, student: NewStudent) -> Result<bool, Error> {
        let res = sqlx::query(
            "UPDATE students SET name = $2, deactivated_at = $3, birth_date = $4, \
             father_name = $5, mother_name = $6, parents_occupation = $7, photo = $8, \
             address_id = $9, updated_at = LOCALTIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .bind(&student.name)
        .bind(student.deactivated_at)
        .bind(student.birth_date)
        .bind(&student.father_name)
        .bind(&student.mother_name)
        .bind(&student.parents_occupation)
        .bind(&student.photo)
        .bind(student.address_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() >= 1)
    }

    async fn delete(&self, id: i64) -> Result<bool, Error> {
        let res = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() >= 1)
    }

    async fn update_photo(&self, id: i64, url: &str) -> Result<bool, Error> {
        let res = sqlx::query(
            "UPDATE students SET photo = $2, updated_at = LOCALTIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .bind(url)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() >= 1)
    }
}
