pub mod click;
pub mod request;

pub use click::ClickRateLimiter;
pub use request::{ReadRateLimited, RequestRateLimiter, StreamRateLimited};
