//! Caching layer for clipway
//!
//! Provides the asset policy table and the partitioned response store that
//! lets the worker answer requests while the origin is unreachable.
//!
//! ## Partitions
//!
//! - `pages` - HTML pages and static assets, written through on fetch
//! - `clips` - remote clips and uploaded local videos
//!
//! Writes go through [`CacheStore::cache_response`], which consults the
//! [`AssetPolicyTable`] for the key's path. See [`policy`] for the config format.

pub mod keys;
pub mod policy;
pub mod store;

pub use keys::{CacheKey, Partition};
pub use policy::{AssetPolicy, AssetPolicyTable, AssetsFile, CacheBehavior};
pub use store::{CacheEntry, CacheStore, PartitionStats};
