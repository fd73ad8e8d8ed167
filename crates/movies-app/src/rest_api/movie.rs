use crate::{
    error::{ApiError, ApiResult},
    repository_from_request,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing, Json,
};
use axum_extra::extract::WithRejection;
use garde::Validate as _;
use http::{header, StatusCode};
use movies_dal::movie::{Movie, MovieRepository, SqlMovieRepository, UpdateOutcome};
use tracing::{debug, warn};

pub const MOVIES_PATH: &str = "/api/movies";

repository_from_request!(SqlMovieRepository);

pub async fn list<R: MovieRepository>(repository: R) -> ApiResult<impl IntoResponse> {
    let movies = repository.list().await?;
    Ok((StatusCode::OK, Json(movies)))
}

pub async fn get<R: MovieRepository>(
    Path(id): Path<i64>,
    repository: R,
) -> ApiResult<impl IntoResponse> {
    let movie = repository.get_by_id(id).await?.ok_or(ApiError::NotFound)?;
    Ok((StatusCode::OK, Json(movie)))
}

pub async fn create<R: MovieRepository>(
    State(state): State<AppState>,
    repository: R,
    WithRejection(Json(payload), _): WithRejection<Json<Movie>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    let movie = repository.add(&payload).await?;
    debug!("Created movie {}", movie.id);

    let location = state.build_url(&format!("{MOVIES_PATH}/{}", movie.id))?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location.to_string())],
        Json(movie),
    ))
}

pub async fn update<R: MovieRepository>(
    Path(id): Path<i64>,
    repository: R,
    WithRejection(Json(payload), _): WithRejection<Json<Movie>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    if payload.id != id {
        return Err(ApiError::IdMismatch {
            path: id,
            body: payload.id,
        });
    }

    match repository.update(&payload).await? {
        UpdateOutcome::Updated => Ok(StatusCode::NO_CONTENT),
        UpdateOutcome::Conflict => {
            // Distinguish vanished row from any other failed write
            if repository.get_by_id(id).await?.is_none() {
                debug!("Movie {id} to update does not exist");
                Err(ApiError::NotFound)
            } else {
                warn!("Movie {id} exists, but update did not apply");
                Err(ApiError::UnresolvedConflict(id))
            }
        }
    }
}

pub async fn delete<R: MovieRepository>(
    Path(id): Path<i64>,
    repository: R,
) -> ApiResult<impl IntoResponse> {
    let movie = repository.get_by_id(id).await?.ok_or(ApiError::NotFound)?;
    repository.delete(&movie).await?;
    debug!("Deleted movie {id}");

    Ok((StatusCode::OK, Json(movie)))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/",
            routing::get(list::<SqlMovieRepository>).post(create::<SqlMovieRepository>),
        )
        .route(
            "/{id}",
            routing::get(get::<SqlMovieRepository>)
                .put(update::<SqlMovieRepository>)
                .delete(delete::<SqlMovieRepository>),
        )
}
