use std::collections::BTreeMap;

use fixtures::seed_movies;
use movies_dal::movie::Movie;
use movies_e2e_tests::{
    extend_url, launch_env, prepare_env,
    rest::{create_movie, movie_json, movies_url},
};
use serde_json::json;
use tracing::info;
use tracing_test::traced_test;

mod fixtures {
    use movies_server::config::ServerConfig;

    const TEST_DATA: &[&str] = &[
        "INSERT INTO movie (id, title, release_date, genre, price, rating) VALUES (1, 'Test Movie 1', '1901-01-01', 'Drama', '1', 'Universal')",
        "INSERT INTO movie (id, title, release_date, genre, price, rating) VALUES (2, 'Test Movie 2', '1902-02-02', 'Comedy', '2', 'Universal')",
        "INSERT INTO movie (id, title, release_date, genre, price, rating) VALUES (3, 'Test Movie 3', '1903-03-03', 'Western', '3', 'Restricted')",
    ];

    pub async fn seed_movies(args: &ServerConfig) {
        let conn = movies_dal::new_pool(&args.database_url()).await.unwrap();
        for stmt in TEST_DATA {
            sqlx::query(stmt).execute(&conn).await.unwrap();
        }
        conn.close().await;
    }
}

#[tokio::test]
#[traced_test]
async fn test_empty_list() {
    let (args, _config_guard) = prepare_env("test_empty_list").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _server) = launch_env(args).await.unwrap();

    let response = client.get(movies_url(&base_url)).send().await.unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(200, response.status().as_u16());
    let movies: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json!([]), movies);
}

#[tokio::test]
#[traced_test]
async fn test_seeded_movies() {
    let (args, _config_guard) = prepare_env("test_seeded_movies").await.unwrap();
    seed_movies(&args).await;
    let base_url = args.base_url.clone();
    let (client, _server) = launch_env(args).await.unwrap();
    let api_url = movies_url(&base_url);

    let response = client.get(api_url.clone()).send().await.unwrap();
    assert!(response.status().is_success());
    let movies: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(3, movies.len());

    let response = client
        .get(extend_url(&api_url, 1))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let movie: serde_json::Value = response.json().await.unwrap();
    assert_eq!(1, movie["id"]);
    assert_eq!("Test Movie 1", movie["title"]);
    assert_eq!("1901-01-01", movie["releaseDate"]);
    assert_eq!("Drama", movie["genre"]);
    assert_eq!(1.0, movie["price"].as_f64().unwrap());
    assert_eq!("Universal", movie["rating"]);

    let response = client
        .get(extend_url(&api_url, 10))
        .send()
        .await
        .unwrap();
    assert_eq!(404, response.status().as_u16());
    assert!(response.text().await.unwrap().is_empty());

    // id mismatch leaves storage unchanged
    let mut changed = movie.clone();
    changed["id"] = json!(2);
    changed["title"] = json!("Changed Title");
    let response = client
        .put(extend_url(&api_url, 1))
        .json(&changed)
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());
    let response = client
        .get(extend_url(&api_url, 1))
        .send()
        .await
        .unwrap();
    let unchanged: serde_json::Value = response.json().await.unwrap();
    assert_eq!(movie, unchanged);

    // missing id
    let mut ghost = movie.clone();
    ghost["id"] = json!(10);
    let response = client
        .put(extend_url(&api_url, 10))
        .json(&ghost)
        .send()
        .await
        .unwrap();
    assert_eq!(404, response.status().as_u16());

    let response = client
        .delete(extend_url(&api_url, 10))
        .send()
        .await
        .unwrap();
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
#[traced_test]
async fn test_movie_lifecycle() {
    let (args, _config_guard) = prepare_env("test_movie_lifecycle").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _server) = launch_env(args).await.unwrap();
    let api_url = movies_url(&base_url);

    let payload = movie_json("Test Movie 4", "Thriller", 1.0, "Restricted");
    let created = create_movie(&client, &base_url, &payload).await.unwrap();
    assert_eq!("Test Movie 4", created.title);
    assert_eq!("Thriller", created.genre);
    assert_eq!("Restricted", created.rating);
    assert_eq!("2004-04-04", created.release_date.to_string());
    let record_url = extend_url(&api_url, created.id);

    let response = client.get(record_url.clone()).send().await.unwrap();
    assert_eq!(200, response.status().as_u16());
    let fetched: Movie = response.json().await.unwrap();
    assert_eq!(created, fetched);

    let mut update = serde_json::to_value(&fetched).unwrap();
    update["title"] = json!("Updated Movie Title 4");
    update["price"] = json!(12.5);
    let response = client
        .put(record_url.clone())
        .json(&update)
        .send()
        .await
        .unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(204, response.status().as_u16());
    assert!(response.text().await.unwrap().is_empty());

    let response = client.get(record_url.clone()).send().await.unwrap();
    let updated: serde_json::Value = response.json().await.unwrap();
    assert_eq!("Updated Movie Title 4", updated["title"]);
    assert_eq!(12.5, updated["price"].as_f64().unwrap());

    let response = client.delete(record_url.clone()).send().await.unwrap();
    assert_eq!(200, response.status().as_u16());
    let deleted: serde_json::Value = response.json().await.unwrap();
    assert_eq!(updated, deleted);

    let response = client.get(record_url.clone()).send().await.unwrap();
    assert_eq!(404, response.status().as_u16());

    let response = client.delete(record_url.clone()).send().await.unwrap();
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
#[traced_test]
async fn test_validation_errors() {
    let (args, _config_guard) = prepare_env("test_validation_errors").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _server) = launch_env(args).await.unwrap();
    let api_url = movies_url(&base_url);

    let invalid = [
        ("title", movie_json("No", "Drama", 10.0, "Universal")),
        ("genre", movie_json("Valid Title", "drama", 10.0, "Universal")),
        ("price", movie_json("Valid Title", "Drama", 100.01, "Universal")),
        (
            "rating",
            movie_json("Valid Title", "Drama", 10.0, "Rated For Everybody Here"),
        ),
    ];

    for (field, payload) in invalid.iter() {
        let response = client
            .post(api_url.clone())
            .json(payload)
            .send()
            .await
            .unwrap();
        assert_eq!(400, response.status().as_u16());
        let errors: BTreeMap<String, Vec<String>> = response.json().await.unwrap();
        info!("Validation errors: {errors:?}");
        assert_eq!(vec![*field], errors.keys().collect::<Vec<_>>());
        assert!(!errors[*field].is_empty());
    }

    let mut null_title = movie_json("Valid Title", "Drama", 10.0, "Universal");
    null_title["title"] = json!(null);
    let mut bad_date = movie_json("Valid Title", "Drama", 10.0, "Universal");
    bad_date["releaseDate"] = json!("someday");
    for (field, payload) in [("title", null_title), ("releaseDate", bad_date)] {
        let response = client
            .post(api_url.clone())
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(400, response.status().as_u16());
        let errors: BTreeMap<String, Vec<String>> = response.json().await.unwrap();
        assert_eq!(vec![field], errors.keys().collect::<Vec<_>>());
    }

    let response = client
        .post(api_url.clone())
        .header("content-type", "application/json")
        .body(r#"{"title": "Broken"#)
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());

    let response = client.get(api_url.clone()).send().await.unwrap();
    let movies: Vec<serde_json::Value> = response.json().await.unwrap();
    assert!(movies.is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_missing_release_date() {
    let (args, _config_guard) = prepare_env("test_missing_release_date").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _server) = launch_env(args).await.unwrap();

    let mut payload = movie_json("Undated Movie", "Drama", 3.0, "Universal");
    payload.as_object_mut().unwrap().remove("releaseDate");
    let created = create_movie(&client, &base_url, &payload).await.unwrap();
    assert_eq!("0001-01-01", created.release_date.to_string());

    let response = client
        .get(extend_url(&movies_url(&base_url), created.id))
        .send()
        .await
        .unwrap();
    let fetched: serde_json::Value = response.json().await.unwrap();
    assert_eq!("0001-01-01", fetched["releaseDate"]);
}
