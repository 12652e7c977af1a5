use async_trait::async_trait;

use crate::db::PgStore;
use crate::err::Error;
use crate::models::NewAddress;
use crate::service::AddressService;

#[async_trait]
impl AddressService for PgStore {
    async fn create(&self, address: NewAddress) -> Result<i64, Error> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO addresses (division, district, township, street_address, type, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, LOCALTIMESTAMP, LOCALTIMESTAMP) RETURNING id",
        )
        .bind(&address.division)
        .bind(&address.district)
        .bind(&address.township)
        .bind(&address.street_address)
        .bind(&address.kind)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update(&self, id: i64, address: NewAddress) -> Result<bool, Error> {
        let res = sqlx::query(
            "UPDATE addresses SET division = $2, district = $3, township = $4, \
             street_address = $5, type = $6, updated_at = LOCALTIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .bind(&address.division)
        .bind(&address.district)
        .bind(&address.township)
        .bind(&address.street_address)
        .bind(&address.kind)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() >= 1)
    }

    async fn delete(&self, id: i64) -> Result<bool, Error> {
        let res = sqlx::query("DELETE FROM addresses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() >= 1)
    }
}
