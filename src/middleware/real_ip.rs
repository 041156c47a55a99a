//! Trusted-proxy header filtering and real-IP resolution.

use crate::config::Config;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::{Data, Request};
use std::net::IpAddr;

const FORWARDED_FOR: &str = "X-Forwarded-For";
const REAL_IP_HEADER: &str = "X-Real-IP";

/// Strips `X-Forwarded-For`/`X-Real-IP` from requests whose immediate peer
/// is not a trusted proxy, so a later stage can't be fooled by a spoofed
/// header from an untrusted client.
pub struct RealIpFairing;

#[rocket::async_trait]
impl Fairing for RealIpFairing {
    fn info(&self) -> Info {
        Info {
            name: "Real IP Resolution",
            kind: Kind::Request,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        let peer_ip = request.remote().map(|addr| addr.ip());
        let config = request.rocket().state::<Config>();

        let trusted = match (peer_ip, config) {
            (Some(ip), Some(config)) => config.is_trusted_proxy(ip),
            _ => false,
        };

        if !trusted {
            request.headers_mut().remove(FORWARDED_FOR);
            request.headers_mut().remove(REAL_IP_HEADER);
        }

        let resolved = if trusted {
            request
                .headers()
                .get_one(REAL_IP_HEADER)
                .and_then(|v| v.parse::<IpAddr>().ok())
                .or_else(|| {
                    request
                        .headers()
                        .get_one(FORWARDED_FOR)
                        .and_then(|v| v.split(',').next())
                        .and_then(|v| v.trim().parse::<IpAddr>().ok())
                })
                .or(peer_ip)
        } else {
            peer_ip
        };

        request.local_cache(|| resolved);
    }
}

/// The resolved client IP for this request, honoring trusted-proxy headers.
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub IpAddr);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let resolved = request.local_cache(|| None::<IpAddr>);
        match resolved {
            Some(ip) => Outcome::Success(ClientIp(*ip)),
            None => Outcome::Error((Status::InternalServerError, ())),
        }
    }
}
