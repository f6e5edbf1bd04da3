//! Store trait definitions

use honestfast_api::{FastRecord, Preferences};

use crate::StoreResult;

/// Record store and preferences
pub trait FastStore: Send + Sync {
    // Fast records

    /// Persist a new record
    fn insert_fast(&self, record: &FastRecord) -> StoreResult<()>;

    /// Overwrite an existing record, matched by id
    fn update_fast(&self, record: &FastRecord) -> StoreResult<()>;

    /// Delete every record
    fn delete_all_fasts(&self) -> StoreResult<()>;

    /// The record with no end time and the most recent start, if any
    fn active_fast(&self) -> StoreResult<Option<FastRecord>>;

    /// All records, newest start first
    fn all_fasts(&self) -> StoreResult<Vec<FastRecord>>;

    // Preferences

    /// Load preferences, `None` if never saved
    fn load_preferences(&self) -> StoreResult<Option<Preferences>>;

    fn save_preferences(&self, prefs: &Preferences) -> StoreResult<()>;

    fn delete_preferences(&self) -> StoreResult<()>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
