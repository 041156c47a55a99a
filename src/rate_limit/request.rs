//! Per-IP request-rate limiting for read and streaming endpoints.

use crate::middleware::ClientIp;
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};
use std::net::IpAddr;
use std::num::NonZeroU32;

type KeyedLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

/// Tracking-click requests are never subject to this limiter: redirects must
/// never be rejected.
pub enum RateLimitBucket {
    Read,
    Stream,
}

pub struct RequestRateLimiter {
    read: KeyedLimiter,
    stream: KeyedLimiter,
}

impl RequestRateLimiter {
    pub fn new() -> Self {
        Self {
            read: RateLimiter::keyed(Quota::per_second(NonZeroU32::new(30).unwrap())),
            stream: RateLimiter::keyed(Quota::per_second(NonZeroU32::new(100).unwrap())),
        }
    }

    pub fn check(&self, bucket: RateLimitBucket, ip: IpAddr) -> bool {
        let limiter = match bucket {
            RateLimitBucket::Read => &self.read,
            RateLimitBucket::Stream => &self.stream,
        };
        limiter.check_key(&ip).is_ok()
    }
}

impl Default for RequestRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Request guard enforcing the 30 req/s per-IP read-endpoint bucket.
/// Not used by the tracking-click endpoint, which must never be rejected.
pub struct ReadRateLimited;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ReadRateLimited {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match check_bucket(request, RateLimitBucket::Read).await {
            Outcome::Success(()) => Outcome::Success(ReadRateLimited),
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Forward(f) => Outcome::Forward(f),
        }
    }
}

/// Request guard enforcing the 100 req/s per-IP streaming-endpoint bucket.
pub struct StreamRateLimited;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for StreamRateLimited {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match check_bucket(request, RateLimitBucket::Stream).await {
            Outcome::Success(()) => Outcome::Success(StreamRateLimited),
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Forward(f) => Outcome::Forward(f),
        }
    }
}

async fn check_bucket<'r>(request: &'r Request<'_>, bucket: RateLimitBucket) -> Outcome<(), ()> {
    let client_ip = match request.guard::<ClientIp>().await {
        Outcome::Success(ip) => ip.0,
        _ => return Outcome::Error((Status::InternalServerError, ())),
    };

    match request.guard::<&State<RequestRateLimiter>>().await {
        Outcome::Success(limiter) if limiter.check(bucket, client_ip) => Outcome::Success(()),
        Outcome::Success(_) => Outcome::Error((Status::TooManyRequests, ())),
        _ => Outcome::Error((Status::InternalServerError, ())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_requests_within_quota() {
        let limiter = RequestRateLimiter::new();
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        for _ in 0..30 {
            assert!(limiter.check(RateLimitBucket::Read, ip));
        }
    }

    #[test]
    fn rejects_once_quota_is_exhausted() {
        let limiter = RequestRateLimiter::new();
        let ip: IpAddr = "127.0.0.2".parse().unwrap();
        for _ in 0..30 {
            limiter.check(RateLimitBucket::Read, ip);
        }
        assert!(!limiter.check(RateLimitBucket::Read, ip));
    }

    #[test]
    fn read_and_stream_buckets_are_independent() {
        let limiter = RequestRateLimiter::new();
        let ip: IpAddr = "127.0.0.3".parse().unwrap();
        for _ in 0..30 {
            limiter.check(RateLimitBucket::Read, ip);
        }
        assert!(!limiter.check(RateLimitBucket::Read, ip));
        assert!(limiter.check(RateLimitBucket::Stream, ip));
    }
}
