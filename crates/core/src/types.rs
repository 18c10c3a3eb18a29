/// Backend primary keys (recordings, users) are integers.
pub type DbId = i64;

/// Backend timestamps are naive UTC; they are parsed into this type.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
