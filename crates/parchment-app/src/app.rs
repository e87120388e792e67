//! App bootstrap: session, API client, image services and the route gate.

use std::sync::Arc;

use parchment_common::storage::AUTH_FLAG_KEY;
use parchment_common::telemetry::{self, TelemetryConfig};
use parchment_common::{
    ApiClient, ApiConfig, ApiImageService, MemoryNavigator, Navigator, ParchmentError,
    SessionStore,
};
use parchment_editor_core::{LogNotifier, Notifier};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::routing::{Resolution, RouteTable, Viewer};

/// Role assumed when none is configured.
pub const DEFAULT_ROLE: &str = "user";

/// Redirect chains longer than this are cut off.
const MAX_REDIRECTS: usize = 4;

/// Where the initial authenticated flag comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialAuth {
    /// Read the persisted `isAuthenticated` flag.
    #[default]
    Storage,
    /// Start with a fixed value, ignoring storage.
    Fixed(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub user_role: SmolStr,
    pub initial_auth: InitialAuth,
    pub api: ApiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_role: SmolStr::new_static(DEFAULT_ROLE),
            initial_auth: InitialAuth::default(),
            api: ApiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults with the API base URL taken from the environment.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ParchmentError> {
        let config: Self = serde_json::from_str(json)?;
        if config.user_role.trim().is_empty() {
            return Err(ParchmentError::Config("user_role is empty".into()));
        }
        if config.api.base_url.trim().is_empty() {
            return Err(ParchmentError::Config("api.base_url is empty".into()));
        }
        Ok(config)
    }
}

/// Platform pieces the app runs on top of.
#[derive(Clone)]
pub struct Platform {
    pub session: SessionStore,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            session: SessionStore::default(),
            navigator: Arc::new(MemoryNavigator::default()),
            notifier: Arc::new(LogNotifier),
        }
    }
}

pub struct App {
    config: AppConfig,
    platform: Platform,
    client: Arc<ApiClient>,
    images: Arc<ApiImageService>,
    routes: RouteTable,
    authenticated: bool,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("authenticated", &self.authenticated)
            .finish_non_exhaustive()
    }
}

impl App {
    pub fn new(config: AppConfig, platform: Platform) -> Self {
        Self::with_routes(config, platform, RouteTable::default())
    }

    pub fn with_routes(config: AppConfig, platform: Platform, routes: RouteTable) -> Self {
        let client = Arc::new(
            ApiClient::new(config.api.clone())
                .with_session(platform.session.clone())
                .with_navigator(platform.navigator.clone())
                .with_notifier(platform.notifier.clone()),
        );
        let images = Arc::new(ApiImageService::new(client.clone()));
        let authenticated = match config.initial_auth {
            InitialAuth::Storage => platform.session.is_authenticated(),
            InitialAuth::Fixed(value) => value,
        };
        tracing::debug!(role = %config.user_role, authenticated, "app bootstrapped");
        Self {
            config,
            platform,
            client,
            images,
            routes,
            authenticated,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn image_service(&self) -> &Arc<ApiImageService> {
        &self.images
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.platform.navigator
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.platform.notifier
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Update the authenticated flag and persist it.
    pub fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
        self.platform
            .session
            .local
            .set(AUTH_FLAG_KEY, authenticated.to_string());
        if !authenticated {
            self.platform.session.clear_tokens();
        }
    }

    pub fn viewer(&self) -> Viewer {
        Viewer {
            role: self.config.user_role.clone(),
            authenticated: self.authenticated,
        }
    }

    /// Gate the navigator's current location, following redirects.
    pub fn current(&self) -> Resolution {
        let mut resolution = self.routes.resolve(&self.navigator().current_path(), &self.viewer());
        for _ in 0..MAX_REDIRECTS {
            let Resolution::Redirect { to, replace } = resolution else {
                return resolution;
            };
            if replace {
                self.navigator().replace(to);
            } else {
                self.navigator().push(to);
            }
            resolution = self.routes.resolve(to, &self.viewer());
        }
        tracing::warn!("too many redirects");
        resolution
    }

    /// Push `path` onto the history and gate it.
    pub fn navigate(&self, path: &str) -> Resolution {
        self.navigator().push(path);
        self.current()
    }
}

/// Install the console subscriber for the app. False if one already exists.
pub fn init_logging() -> bool {
    telemetry::init(TelemetryConfig::from_env("parchment-app"))
}
