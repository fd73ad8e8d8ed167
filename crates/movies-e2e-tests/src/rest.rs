use anyhow::{Result, ensure};
use movies_dal::movie::Movie;
use reqwest::{StatusCode, header};
use serde_json::json;
use tracing::info;
use url::Url;

pub fn movies_url(base_url: &Url) -> Url {
    base_url.join("api/movies").unwrap()
}

pub fn movie_json(title: &str, genre: &str, price: f64, rating: &str) -> serde_json::Value {
    json!({
        "title": title,
        "releaseDate": "2004-04-04",
        "genre": genre,
        "price": price,
        "rating": rating
    })
}

pub async fn create_movie(
    client: &reqwest::Client,
    base_url: &Url,
    payload: &serde_json::Value,
) -> Result<Movie> {
    let response = client
        .post(movies_url(base_url))
        .json(payload)
        .send()
        .await?;
    info!("Create response: {:#?}", response);
    ensure!(
        response.status() == StatusCode::CREATED,
        "Unexpected status {}",
        response.status()
    );
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|l| l.to_str().ok())
        .map(str::to_string);

    let new_movie: Movie = response.json().await?;
    let expected = crate::extend_url(&movies_url(base_url), new_movie.id);
    ensure!(
        location.as_deref() == Some(expected.as_str()),
        "Unexpected location {location:?}"
    );
    Ok(new_movie)
}
