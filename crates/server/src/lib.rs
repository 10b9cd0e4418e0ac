use std::sync::Arc;

use axum::{Router, http::HeaderName};
use db::DBService;
use services::services::{
    artists::ArtistService, cache::CacheService, events::EventService, invites::InviteService,
    leave_artist::LeaveArtistService, notification::NotificationService, realtime::ChangeFeed,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use config::Config;

/// Shared state handed to every route: database, change feed, cache and config
#[derive(Clone)]
pub struct Deployment {
    db: DBService,
    feed: ChangeFeed,
    cache: CacheService,
    config: Arc<Config>,
}

impl Deployment {
    pub async fn new(config: Config) -> Result<Self, sqlx::Error> {
        let db = DBService::new(&config.database_url).await?;
        Ok(Self::from_parts(db, config))
    }

    pub fn from_parts(db: DBService, config: Config) -> Self {
        Self {
            db,
            feed: ChangeFeed::default(),
            cache: CacheService::with_capacity(
                config.artist_cache_ttl,
                config.artist_cache_max_entries,
            ),
            config: Arc::new(config),
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn artists(&self) -> ArtistService {
        ArtistService::new(self.db.pool.clone(), self.feed.clone())
    }

    pub fn events(&self) -> EventService {
        EventService::new(self.db.pool.clone(), self.feed.clone())
    }

    pub fn invites(&self) -> InviteService {
        InviteService::new(self.db.pool.clone(), self.feed.clone())
    }

    pub fn leave_artist(&self) -> LeaveArtistService {
        LeaveArtistService::new(self.db.pool.clone(), self.feed.clone())
    }

    pub fn notifications(&self) -> NotificationService {
        NotificationService::new(self.db.pool.clone())
    }
}

pub fn app(deployment: Deployment) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static(auth::USER_ID_HEADER),
        ]);

    routes::router(&deployment)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(deployment)
}
