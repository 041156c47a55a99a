//! Test-only helpers for building a Rocket instance and an ephemeral
//! metrics database, mirrored for integration tests in `tests/`.

use rocket::config::LogLevel;
use rocket::figment::Figment;
use rocket::local::asynchronous::Client as AsyncClient;
use rocket::local::blocking::Client;
use rocket::{Build, Rocket, Route};

pub use database::{TestDatabase, TestDatabaseError};

/// Builder for constructing Rocket instances tailored for integration tests.
#[derive(Default)]
pub struct TestRocketBuilder {
    figment: Figment,
    mounts: Vec<(String, Vec<Route>)>,
    managed: Vec<Box<dyn FnOnce(Rocket<Build>) -> Rocket<Build>>>,
}

impl TestRocketBuilder {
    pub fn new() -> Self {
        let figment = rocket::Config::figment()
            .merge(("port", 0))
            .merge(("log_level", LogLevel::Off))
            .merge(("cli_colors", false));

        Self {
            figment,
            mounts: Vec::new(),
            managed: Vec::new(),
        }
    }

    pub fn mount_routes(mut self, routes: Vec<Route>) -> Self {
        self.mounts.push(("/".to_string(), routes));
        self
    }

    pub fn manage<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.managed.push(Box::new(move |rocket| rocket.manage(value)));
        self
    }

    pub fn build(self) -> Rocket<Build> {
        let mut rocket = rocket::custom(self.figment);

        for (base, routes) in self.mounts {
            rocket = rocket.mount(base, routes);
        }

        for attach in self.managed {
            rocket = attach(rocket);
        }

        rocket
    }

    pub fn blocking_client(self) -> Client {
        Client::tracked(self.build()).expect("valid Rocket instance")
    }

    pub async fn async_client(self) -> AsyncClient {
        AsyncClient::tracked(self.build())
            .await
            .expect("valid Rocket instance")
    }
}

pub mod database {
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
    use sqlx::{ConnectOptions, PgPool};
    use testcontainers::core::WaitFor;
    use testcontainers::{GenericImage, ImageExt};
    use testcontainers_modules::testcontainers::{
        core::error::TestcontainersError, runners::AsyncRunner, ContainerAsync,
    };
    use log::LevelFilter;
    use thiserror::Error;
    use tokio::runtime::Handle;

    #[derive(Debug, Error)]
    pub enum TestDatabaseError {
        #[error("database error: {0}")]
        Sqlx(#[from] sqlx::Error),
        #[error("container error: {0}")]
        Container(#[from] TestcontainersError),
    }

    const METRICS_SCHEMA: &str = r#"
        CREATE TABLE IF NOT EXISTS email_views (
            time TIMESTAMPTZ NOT NULL DEFAULT now(),
            session_id TEXT NOT NULL,
            email_id TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS email_link_clicks (
            time TIMESTAMPTZ NOT NULL DEFAULT now(),
            session_id TEXT NOT NULL,
            email_id TEXT NOT NULL,
            link_url TEXT NOT NULL,
            link_index INTEGER NOT NULL
        );
    "#;

    /// Ephemeral metrics database provisioned in a disposable Postgres
    /// container, for integration tests that exercise tracking handlers.
    pub struct TestDatabase {
        pool: Option<PgPool>,
        container: Option<ContainerAsync<GenericImage>>,
    }

    impl TestDatabase {
        pub async fn new() -> Result<Self, TestDatabaseError> {
            let image = GenericImage::new("postgres", "16-alpine").with_wait_for(
                WaitFor::message_on_stdout("database system is ready to accept connections"),
            );

            let request = image
                .with_env_var("POSTGRES_DB", "postgres")
                .with_env_var("POSTGRES_USER", "postgres")
                .with_env_var("POSTGRES_PASSWORD", "postgres");

            let container = request.start().await?;
            let host = container.get_host().await?.to_string();
            let port = container.get_host_port_ipv4(5432).await?;
            let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

            let options: PgConnectOptions = url.parse()?;
            let options = options.log_statements(LevelFilter::Off);

            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?;

            sqlx::query(METRICS_SCHEMA).execute(&pool).await?;

            Ok(Self {
                pool: Some(pool),
                container: Some(container),
            })
        }

        pub fn pool(&self) -> &PgPool {
            self.pool.as_ref().expect("test database pool is available")
        }

        pub fn pool_clone(&self) -> PgPool {
            self.pool().clone()
        }
    }

    impl Drop for TestDatabase {
        fn drop(&mut self) {
            if let Some(pool) = self.pool.take() {
                if let Ok(handle) = Handle::try_current() {
                    handle.spawn(async move {
                        pool.close().await;
                    });
                }
            }
            if let Some(container) = self.container.take() {
                drop(container);
            }
        }
    }
}
