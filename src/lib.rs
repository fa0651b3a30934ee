#[macro_use]
extern crate rocket;

pub mod auth;
pub mod db;
pub mod models;
pub mod request_logger;
pub mod routes;

use std::sync::{Arc, Once};

use crate::auth::assets::{AssetConfig, HttpAssetStore};
use crate::auth::store::PgAccountStore;
use crate::auth::{AssetStore, AccountStore, AuthConfig, AuthState};
use crate::db::VidtubeDb;
use crate::request_logger::RequestLogger;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};

static LOGGER: Once = Once::new();
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    // Configure CORS
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![
                Method::Get,
                Method::Post,
                Method::Put,
                Method::Delete,
                Method::Patch,
            ]
            .into_iter()
            .map(From::from)
            .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(VidtubeDb::init())
        .attach(cors)
        // Run database migrations on startup
        .attach(AdHoc::try_on_ignite(
            "Run Migrations",
            |rocket| async move {
                match VidtubeDb::fetch(&rocket) {
                    Some(db) => {
                        let pool = (**db).clone();
                        match MIGRATOR.run(&pool).await {
                            Ok(()) => {
                                log::info!("database migrations successful");
                                Ok(rocket.manage(pool))
                            }
                            Err(e) => {
                                log::error!("database migrations failed: {}", e);
                                Err(rocket)
                            }
                        }
                    }
                    None => {
                        log::error!("database pool not available for migrations");
                        Err(rocket)
                    }
                }
            },
        ))
        // Build the auth state: config from env, Postgres-backed account
        // store, HTTP-backed asset store. Secrets are read once here and
        // injected; request handlers never touch the environment.
        .attach(AdHoc::try_on_ignite("Auth State", |rocket| async move {
            let config = match AuthConfig::from_env() {
                Ok(config) => config,
                Err(e) => {
                    log::error!("auth configuration failed: {}", e);
                    return Err(rocket);
                }
            };

            let asset_config = match AssetConfig::from_env() {
                Ok(config) => config,
                Err(e) => {
                    log::error!("asset store configuration failed: {}", e);
                    return Err(rocket);
                }
            };

            let pool = match rocket.state::<rocket_db_pools::sqlx::PgPool>() {
                Some(pool) => pool.clone(),
                None => {
                    log::error!("database pool not available for auth state");
                    return Err(rocket);
                }
            };

            let accounts: Arc<dyn AccountStore> = Arc::new(PgAccountStore::new(pool));
            let assets: Arc<dyn AssetStore> = match HttpAssetStore::new(asset_config) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    log::error!("asset store initialization failed: {}", e);
                    return Err(rocket);
                }
            };

            match AuthState::new(config, accounts, assets) {
                Ok(state) => Ok(rocket.manage(state)),
                Err(e) => {
                    log::error!("auth state initialization failed: {}", e);
                    Err(rocket)
                }
            }
        }))
        .mount(
            "/api/v1",
            openapi_get_routes![
                // Health routes
                routes::health::health_check,
                // Credential and session routes
                auth::routes::register,
                auth::routes::login,
                auth::routes::refresh,
                auth::routes::logout,
                auth::routes::current_account,
                auth::routes::change_password,
            ],
        )
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../v1/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Vidtube API", "../../v1/openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use std::sync::Arc;

    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};

    use crate::auth::assets::MemoryAssetStore;
    use crate::auth::store::MemoryAccountStore;
    use crate::auth::{AuthConfig, AuthState};

    /// Auth configuration with fixed secrets, suitable only for tests.
    pub fn test_auth_config() -> AuthConfig {
        AuthConfig {
            access_token_secret: "access-secret-for-tests".into(),
            refresh_token_secret: "refresh-secret-for-tests".into(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 604800,
            access_cookie_name: "access_token".into(),
            refresh_cookie_name: "refresh_token".into(),
            cookie_domain: None,
            cookie_secure: false,
        }
    }

    /// In-memory auth wiring plus handles to the underlying stores so tests
    /// can seed or inspect state directly.
    pub struct MemoryAuthHarness {
        pub state: AuthState,
        pub accounts: Arc<MemoryAccountStore>,
        pub assets: Arc<MemoryAssetStore>,
    }

    pub fn memory_auth_state() -> MemoryAuthHarness {
        memory_auth_state_with(test_auth_config())
    }

    pub fn memory_auth_state_with(config: AuthConfig) -> MemoryAuthHarness {
        let accounts = Arc::new(MemoryAccountStore::new());
        let assets = Arc::new(MemoryAssetStore::new());
        let state = AuthState::new(config, accounts.clone(), assets.clone())
            .expect("auth state for tests");

        MemoryAuthHarness {
            state,
            accounts,
            assets,
        }
    }

    /// Builder for constructing Rocket instances tailored for integration tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        auth_state: Option<AuthState>,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                auth_state: None,
            }
        }

        /// Mount routes under `/api/v1`.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/api/v1".to_string(), routes));
            self
        }

        /// Manage an `AuthState` for tests that exercise credential routes.
        pub fn manage_auth_state(mut self, state: AuthState) -> Self {
            self.auth_state = Some(state);
            self
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment);

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(state) = self.auth_state {
                rocket = rocket.manage(state);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Blocking client without cookie tracking, for tests that need full
        /// control over which cookies accompany each request.
        pub fn untracked_blocking_client(self) -> Client {
            Client::untracked(self.build()).expect("valid Rocket instance")
        }
    }
}
