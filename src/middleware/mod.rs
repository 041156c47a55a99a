pub mod real_ip;
pub mod request_id;
pub mod security_headers;

pub use real_ip::{ClientIp, RealIpFairing};
pub use request_id::RequestIdFairing;
pub use security_headers::SecurityHeadersFairing;
