use std::sync::Arc;

use movies_dal::Pool;
use url::Url;

use crate::error::ApiResult;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(pool: Pool, base_url: Url) -> Self {
        AppState {
            state: Arc::new(AppStateInner { pool, base_url }),
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    /// Absolute URL of a server path, as seen by clients
    pub fn build_url(&self, path: &str) -> ApiResult<Url> {
        let url = self.state.base_url.join(path.trim_start_matches('/'))?;
        Ok(url)
    }
}

struct AppStateInner {
    pool: Pool,
    base_url: Url,
}
