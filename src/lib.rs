#[macro_use]
extern crate rocket;

pub mod base_url;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod link_rewriter;
pub mod middleware;
pub mod models;
pub mod notifier;
pub mod rate_limit;
pub mod request_logger;
pub mod routes;
pub mod session;
pub mod slug;

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support;

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::db::Store;
use crate::middleware::{RealIpFairing, RequestIdFairing, SecurityHeadersFairing};
use crate::notifier::ViewNotifier;
use crate::rate_limit::{ClickRateLimiter, RequestRateLimiter};
use crate::request_logger::RequestLogger;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use std::sync::{Arc, Once};

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info,rocket::server=warn"))
            .init();
    });
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    let config = Config::from_env().expect("invalid configuration");

    let cors_origins: Vec<&str> = config
        .cors_allowed_origins
        .iter()
        .map(String::as_str)
        .collect();

    let localhost_patterns = [
        r"^https?://localhost(:[0-9]+)?$",
        r"^https?://127\.0\.0\.1(:[0-9]+)?$",
    ];

    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::some(&cors_origins, &localhost_patterns))
        .allowed_methods(
            vec![Method::Get, Method::Options]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("error creating CORS fairing");

    let enable_hsts = config.enable_hsts;

    rocket::build()
        .attach(RequestLogger)
        .attach(RealIpFairing)
        .attach(RequestIdFairing)
        .attach(cors)
        .attach(SecurityHeadersFairing { enable_hsts })
        .manage(ResponseCache::new())
        .manage(ViewNotifier::new())
        .manage(RequestRateLimiter::new())
        .manage(ClickRateLimiter::new())
        .manage(config.clone())
        .attach(AdHoc::try_on_ignite("Connect Store", move |rocket| {
            let config = config.clone();
            Box::pin(async move {
                match Store::connect(&config).await {
                    Ok(store) => Ok(rocket.manage(store)),
                    Err(err) => {
                        log::error!("failed to connect to content database: {err}");
                        Err(rocket)
                    }
                }
            })
        }))
        .mount(
            "/",
            routes![
                routes::docs::index,
                routes::docs::docs,
                routes::health::healthz,
                routes::content::list_mailing_lists,
                routes::content::list_emails,
                routes::content::grouped_emails,
                routes::track::record_view,
                routes::track::record_click,
                routes::track::stats_stream,
            ],
        )
}
