//! Match persistence trait definition.

use botfleet_types::error::RepositoryError;
use botfleet_types::match_record::{MatchInsert, MatchRecord, NewMatchRecord};

/// Repository trait for persisted platform matches.
///
/// Inserts are duplicate-checked by platform match id: a conflicting
/// insert reports `Duplicate`, it never errors.
pub trait MatchRepository: Send + Sync {
    fn add(
        &self,
        record: &NewMatchRecord,
    ) -> impl std::future::Future<Output = Result<MatchInsert, RepositoryError>> + Send;

    fn get_by_match_id(
        &self,
        match_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<MatchRecord>, RepositoryError>> + Send;
}
