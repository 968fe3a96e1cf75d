//! Object key layout in the data bucket.
//!
//! The Glue crawler is pointed at `raw/users/` and turns the Hive-style
//! `year=/month=/day=` segments into partition columns, so this layout is a
//! contract with the catalog and must not drift.

use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

pub const RAW_USERS_PREFIX: &str = "raw/users";

/// The day partition for an invocation at `now`, with a trailing slash.
pub fn partition_prefix(now: DateTime<Utc>) -> String {
    format!(
        "{RAW_USERS_PREFIX}/year={:04}/month={:02}/day={:02}/",
        now.year(),
        now.month(),
        now.day()
    )
}

/// The full object key for one invocation's output.
///
/// Two invocations on the same day share the partition but never the object:
/// the time of day plus a random v4 UUID keeps concurrent writers apart.
pub fn object_key(now: DateTime<Utc>, unique: Uuid) -> String {
    format!(
        "{}users_{}_{}.parquet",
        partition_prefix(now),
        now.format("%H%M%S"),
        unique.simple()
    )
}
