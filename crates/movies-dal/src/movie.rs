use std::str::FromStr as _;

use crate::{
    error::{Error, Result},
    ChosenDB, Pool,
};
use async_trait::async_trait;
use futures::{future, TryStreamExt as _};
use garde::Validate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{macros::date, Date};
use tracing::debug;

pub const MIN_PRICE: Decimal = Decimal::ONE;
pub const MAX_PRICE: Decimal = Decimal::ONE_HUNDRED;

/// Movie as stored and as exchanged over the API.
///
/// `id` is assigned by storage, so it is ignored on create and defaults to 0 when absent
/// from a payload. String fields and price also default when missing, so a missing field
/// shows up as a validation failure of that field rather than as malformed input.
/// `releaseDate` has no constraint and defaults to 0001-01-01.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    #[garde(skip)]
    #[serde(default)]
    pub id: i64,
    #[garde(length(chars, min = 3, max = 50), custom(not_blank))]
    #[serde(default)]
    pub title: String,
    #[garde(skip)]
    #[serde(default = "default_release_date")]
    pub release_date: Date,
    #[garde(length(chars, max = 50), pattern(r#"^[A-Z]+[a-zA-Z"'\s-]*$"#))]
    #[serde(default)]
    pub genre: String,
    #[garde(custom(price_in_range))]
    #[serde(default)]
    pub price: Decimal,
    #[garde(length(chars, max = 20), pattern(r#"^[A-Z]+[a-zA-Z"'\s-]*$"#))]
    #[serde(default)]
    pub rating: String,
}

fn default_release_date() -> Date {
    date!(0001 - 01 - 01)
}

fn not_blank(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        Err(garde::Error::new("must not be blank"))
    } else {
        Ok(())
    }
}

fn price_in_range(value: &Decimal, _ctx: &()) -> garde::Result {
    if *value < MIN_PRICE || *value > MAX_PRICE {
        Err(garde::Error::new(format!(
            "price must be between {MIN_PRICE} and {MAX_PRICE}"
        )))
    } else {
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MovieRecord {
    id: i64,
    title: String,
    release_date: Date,
    genre: String,
    price: String,
    rating: String,
}

impl TryFrom<MovieRecord> for Movie {
    type Error = Error;

    fn try_from(record: MovieRecord) -> Result<Self> {
        let price = Decimal::from_str(&record.price).map_err(|e| Error::InvalidRecord {
            id: record.id,
            reason: format!("price {:?} is not a decimal: {e}", record.price),
        })?;
        Ok(Movie {
            id: record.id,
            title: record.title,
            release_date: record.release_date,
            genre: record.genre,
            price,
            rating: record.rating,
        })
    }
}

/// Result of an update that reached storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// Target row was not there when the update was written.
    Conflict,
}

#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait MovieRepository: Send + Sync {
    /// All movies in storage order.
    async fn list(&self) -> Result<Vec<Movie>>;
    async fn get_by_id(&self, id: i64) -> Result<Option<Movie>>;
    /// Inserts new row, `movie.id` is ignored. Returns stored movie with assigned id.
    async fn add(&self, movie: &Movie) -> Result<Movie>;
    /// Replaces all fields of the row identified by `movie.id`.
    async fn update(&self, movie: &Movie) -> Result<UpdateOutcome>;
    async fn delete(&self, movie: &Movie) -> Result<()>;
}

const SELECT_ALL: &str = "SELECT id, title, release_date, genre, price, rating FROM movie";
const SELECT_ONE: &str =
    "SELECT id, title, release_date, genre, price, rating FROM movie WHERE id = ?";
const INSERT: &str = "INSERT INTO movie (title, release_date, genre, price, rating) VALUES (?, ?, ?, ?, ?) \
    RETURNING id, title, release_date, genre, price, rating";
const UPDATE: &str =
    "UPDATE movie SET title = ?, release_date = ?, genre = ?, price = ?, rating = ? WHERE id = ?";
const DELETE: &str = "DELETE FROM movie WHERE id = ?";

pub type SqlMovieRepository = MovieRepositoryImpl<Pool>;

pub struct MovieRepositoryImpl<E> {
    executor: E,
}

impl<E> MovieRepositoryImpl<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl MovieRepository for MovieRepositoryImpl<sqlx::Pool<ChosenDB>> {
    async fn list(&self) -> Result<Vec<Movie>> {
        let records = sqlx::query_as::<_, MovieRecord>(SELECT_ALL)
            .fetch(&self.executor)
            .map_err(Error::from)
            .and_then(|r| future::ready(Movie::try_from(r)))
            .try_collect::<Vec<_>>()
            .await?;
        Ok(records)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Movie>> {
        sqlx::query_as::<_, MovieRecord>(SELECT_ONE)
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .map(Movie::try_from)
            .transpose()
    }

    async fn add(&self, movie: &Movie) -> Result<Movie> {
        let record = sqlx::query_as::<_, MovieRecord>(INSERT)
            .bind(&movie.title)
            .bind(movie.release_date)
            .bind(&movie.genre)
            .bind(movie.price.to_string())
            .bind(&movie.rating)
            .fetch_one(&self.executor)
            .await?;
        debug!("Inserted movie {}", record.id);
        record.try_into()
    }

    async fn update(&self, movie: &Movie) -> Result<UpdateOutcome> {
        let result = sqlx::query(UPDATE)
            .bind(&movie.title)
            .bind(movie.release_date)
            .bind(&movie.genre)
            .bind(movie.price.to_string())
            .bind(&movie.rating)
            .bind(movie.id)
            .execute(&self.executor)
            .await?;

        if result.rows_affected() == 0 {
            debug!("Update of movie {} affected no rows", movie.id);
            Ok(UpdateOutcome::Conflict)
        } else {
            Ok(UpdateOutcome::Updated)
        }
    }

    async fn delete(&self, movie: &Movie) -> Result<()> {
        let res = sqlx::query(DELETE)
            .bind(movie.id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            debug!("Movie {} was already deleted", movie.id);
        }
        Ok(())
    }
}
