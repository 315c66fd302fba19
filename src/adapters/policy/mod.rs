//! Policy oracle adapters.

mod http_fetcher;

pub use http_fetcher::HttpPolicyFetcher;
