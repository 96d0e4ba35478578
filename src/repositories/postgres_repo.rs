use std::time::Duration;
use anyhow::Context;
use bb8_postgres::bb8::{Pool, PooledConnection};
use bb8_postgres::PostgresConnectionManager;
use bb8_postgres::tokio_postgres::{NoTls, Row};
use bb8_postgres::tokio_postgres;
use tracing::{debug, info, warn};
use crate::config::Config;
use crate::models::property::{NewProperty, Property, PropertyListing, PropertySearchOptions};
use crate::models::reservation::Reservation;
use crate::models::user::{NewUser, User};
use crate::repositories::property_query::build_property_search;
use crate::repositories::{validate_limit, RepoError};

pub const RETRY_LIMIT: usize = 3;
pub const RETRY_DELAY: Duration = Duration::from_millis(500);

pub struct PostgresRepo {
    postgres_connection: Pool<PostgresConnectionManager<NoTls>>,
    retry_limit: usize,
    retry_delay: Duration,
}

impl PostgresRepo {
    pub fn new(
        postgres_connection: Pool<PostgresConnectionManager<NoTls>>,
    ) -> Self {
        Self {
            postgres_connection,
            retry_limit: RETRY_LIMIT,
            retry_delay: RETRY_DELAY,
        }
    }

    pub fn with_retry_policy(mut self, retry_limit: usize, retry_delay: Duration) -> Self {
        self.retry_limit = retry_limit.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Opens the pool and fails unless one connection answers `SELECT 1`.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let manager = PostgresConnectionManager::new_from_stringlike(&config.database_url, NoTls)
            .context("Invalid postgres connection string")?;
        let pool = Pool::builder()
            .max_size(config.pool_max_size)
            .connection_timeout(Duration::from_millis(config.pool_connection_timeout_ms))
            .build(manager)
            .await
            .context("Error building the postgres connection pool")?;

        {
            let conn = pool.get().await.context("Error connecting to postgres")?;
            conn.execute("SELECT 1;", &[])
                .await
                .context("Error connecting to postgres")?;
        }

        info!("Postgres pool ready with max size: {}", config.pool_max_size);
        Ok(Self::new(pool).with_retry_policy(
            config.pool_retry_limit,
            Duration::from_millis(config.pool_retry_delay_ms),
        ))
    }

    /// Shuts the pool down. Consuming `self` drops the last pool handle, which
    /// closes every idle connection; no new checkouts are possible afterwards.
    pub fn close(self) {
        let state = self.postgres_connection.state();
        info!(
            "Closing postgres pool with {} connections ({} idle)",
            state.connections,
            state.idle_connections
        );
        drop(self.postgres_connection);
        info!("Postgres pool closed");
    }

    async fn get_postgres_connection(
        &self,
    ) -> Result<PooledConnection<'_, PostgresConnectionManager<NoTls>>, RepoError> {
        let mut last_error = String::new();
        for attempt in 1..=self.retry_limit {
            match self.postgres_connection.get().await {
                Ok(conn) => return Ok(conn),
                Err(e) => {
                    last_error = e.to_string();
                    if attempt == self.retry_limit {
                        warn!("Failed to retrieve postgres connection due to: {}, giving up", e);
                        break;
                    }
                    warn!("Failed to retrieve postgres connection due to: {}, retrying in {:?}", e, self.retry_delay);
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }

        Err(RepoError::Pool(last_error))
    }

    pub async fn ping(&self) -> Result<(), RepoError> {
        let conn = self.get_postgres_connection().await?;
        conn.execute("SELECT 1;", &[]).await?;
        Ok(())
    }

    pub async fn get_user_with_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, RepoError> {
        let conn = self.get_postgres_connection().await?;
        let stmt = "SELECT * FROM users WHERE lower(users.email) = lower($1);";

        let row = conn.query_opt(stmt, &[&email]).await?;
        match row {
            Some(row) => Ok(Some(parse_row_into_user(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_user_with_id(
        &self,
        id: i32,
    ) -> Result<Option<User>, RepoError> {
        let conn = self.get_postgres_connection().await?;
        let stmt = "SELECT * FROM users WHERE users.id = $1;";

        let row = conn.query_opt(stmt, &[&id]).await?;
        match row {
            Some(row) => Ok(Some(parse_row_into_user(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn add_user(
        &self,
        user: &NewUser,
    ) -> Result<User, RepoError> {
        let conn = self.get_postgres_connection().await?;
        let stmt = "INSERT INTO users (name, email, password) VALUES ($1, $2, $3) RETURNING *;";

        let row = conn
            .query_one(stmt, &[&user.name, &user.email, &user.password])
            .await
            .map_err(RepoError::from_query)?;

        Ok(parse_row_into_user(&row)?)
    }

    pub async fn get_all_reservations(
        &self,
        guest_id: i32,
        limit: i64,
    ) -> Result<Vec<Reservation>, RepoError> {
        let limit = validate_limit(limit)?;
        let conn = self.get_postgres_connection().await?;
        let stmt = "SELECT * FROM reservations \
            WHERE guest_id = $1 \
            ORDER BY start_date \
            LIMIT $2;";

        let rows = conn.query(stmt, &[&guest_id, &limit]).await?;
        let mut reservations = Vec::with_capacity(rows.len());
        for row in rows {
            reservations.push(parse_row_into_reservation(&row)?);
        }

        Ok(reservations)
    }

    pub async fn get_all_properties(
        &self,
        options: &PropertySearchOptions,
        limit: i64,
    ) -> Result<Vec<PropertyListing>, RepoError> {
        let query = build_property_search(options, limit)?;
        debug!("Property search: {} with params: {:?}", query.statement, query.params);

        let conn = self.get_postgres_connection().await?;
        let rows = conn.query(query.statement.as_str(), &query.sql_params()).await?;

        let mut properties = Vec::with_capacity(rows.len());
        for row in rows {
            properties.push(PropertyListing {
                property: parse_row_into_property(&row)?,
                average_rating: row.try_get("average_rating")?,
            });
        }

        Ok(properties)
    }

    pub async fn add_property(
        &self,
        property: &NewProperty,
    ) -> Result<Property, RepoError> {
        let conn = self.get_postgres_connection().await?;
        let stmt = "INSERT INTO properties ( \
                owner_id, title, description, thumbnail_photo_url, cover_photo_url, \
                cost_per_night, parking_spaces, number_of_bathrooms, number_of_bedrooms, \
                country, street, city, province, post_code \
            ) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
            RETURNING *;";

        let row = conn
            .query_one(
                stmt,
                &[
                    &property.owner_id,
                    &property.title,
                    &property.description,
                    &property.thumbnail_photo_url,
                    &property.cover_photo_url,
                    &property.cost_per_night,
                    &property.parking_spaces,
                    &property.number_of_bathrooms,
                    &property.number_of_bedrooms,
                    &property.country,
                    &property.street,
                    &property.city,
                    &property.province,
                    &property.post_code,
                ],
            )
            .await
            .map_err(RepoError::from_query)?;

        Ok(parse_row_into_property(&row)?)
    }
}

fn parse_row_into_user(
    row: &Row,
) -> Result<User, tokio_postgres::Error> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password: row.try_get("password")?,
    })
}

fn parse_row_into_reservation(
    row: &Row,
) -> Result<Reservation, tokio_postgres::Error> {
    Ok(Reservation {
        id: row.try_get("id")?,
        guest_id: row.try_get("guest_id")?,
        property_id: row.try_get("property_id")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
    })
}

fn parse_row_into_property(
    row: &Row,
) -> Result<Property, tokio_postgres::Error> {
    Ok(Property {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        thumbnail_photo_url: row.try_get("thumbnail_photo_url")?,
        cover_photo_url: row.try_get("cover_photo_url")?,
        cost_per_night: row.try_get("cost_per_night")?,
        parking_spaces: row.try_get("parking_spaces")?,
        number_of_bathrooms: row.try_get("number_of_bathrooms")?,
        number_of_bedrooms: row.try_get("number_of_bedrooms")?,
        country: row.try_get("country")?,
        street: row.try_get("street")?,
        city: row.try_get("city")?,
        province: row.try_get("province")?,
        post_code: row.try_get("post_code")?,
        active: row.try_get("active")?,
    })
}
