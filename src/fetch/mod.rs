pub mod quotes;
pub mod request;
pub mod series;

pub use quotes::QuoteFetcher;
pub use request::CandleEndpoint;
pub use series::{PriceSeries, SeriesStatus, UsableSeries};

pub type FetchResult<T> = std::result::Result<T, crate::error::FetchError>;

#[inline]
pub fn ensure_concurrency_limit(limit: usize) -> usize {
    limit.max(1)
}
