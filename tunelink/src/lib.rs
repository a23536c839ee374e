mod error;
pub use error::*;

mod timestamp;
pub use timestamp::*;

mod catalog;
pub use catalog::*;

mod link;
pub use link::ContentLink;

mod context;
pub use context::*;

pub mod bounded;
pub mod persistence;
pub mod rank;

#[doc(hidden)]
#[cfg(feature = "test-utilities")]
pub mod test;

pub(crate) mod aggregator;
pub(crate) mod backfill;
pub(crate) mod charts;
pub(crate) mod provider;

pub use aggregator::SearchAggregator;
pub use backfill::{
    ArtworkCacheEntry, EntityDetail, EntityDetailFetcher, EntityLister, EntitySummary,
    MetadataBackfillCache, PlatformDetail, PrefetchOptions, ARTWORK_STORAGE_KEY,
    DEFAULT_ARTWORK_CAPACITY, DEFAULT_BACKFILL_TIMEOUT, DEFAULT_MAX_BACKFILL, DEFAULT_PAGE_SIZE,
};
pub use charts::{CacheEntry, ChartsCache, DEFAULT_CHARTS_TTL};
pub use provider::ProviderClient;
pub use rank::{rank, RankedItem};

pub use async_trait::async_trait;
pub use bytes;
