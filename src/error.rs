use std::path::PathBuf;

use thiserror::Error;

use crate::assignment::StoreError;

/// Problems with the bucket registry or the configuration file it came from.
///
/// These are fatal: nothing retries them.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no buckets configured")]
    EmptyRegistry,
    #[error("bucket {0:?} is configured more than once")]
    DuplicateBucket(String),
    #[error("bucket names must not be empty")]
    EmptyBucketName,
    #[error("could not find hub {0}")]
    UnknownBucket(String),
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Errors returned by [`Sharder`](crate::Sharder) and [`Admin`](crate::Admin).
#[derive(Debug, Error)]
pub enum ShardError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// An administrative lookup matched nothing.
    #[error("could not find user {name}")]
    NotFound { name: String },
    /// More than one row matched where the (kind, name) constraint allows one.
    #[error("found {count} assignments for {name} in {kind}; the store is inconsistent")]
    Ambiguous {
        kind: String,
        name: String,
        count: usize,
    },
    #[error("{name} is already assigned to {bucket}")]
    AlreadyAssigned { name: String, bucket: String },
    /// The insert kept colliding with rows that vanished before they could be read.
    #[error("gave up assigning {name} after {attempts} attempts")]
    Contended { name: String, attempts: usize },
}
