/// Primary keys for administrator-managed entities (people, templates).
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A person in the lab roster.
pub type PersonId = DbId;

/// A recurring obligation definition.
pub type TemplateId = DbId;

/// Engine-created records (instances, swap requests) are keyed by UUIDv7 so
/// they sort by creation time before the persistence layer ever sees them.
pub type RecordId = uuid::Uuid;
