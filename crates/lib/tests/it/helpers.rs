use chrono::{DateTime, Utc};
use recordvault::{
    Account, Field, KdfParams, MainStore, Record, SharedStore,
    store::PlainStore,
};

// Re-export tokio test macro for convenience
pub use tokio;

/// Argon2 parameters cheap enough for tests.
pub fn test_kdf_params() -> KdfParams {
    KdfParams::new(64, 1, 1)
}

pub fn test_account(id: &str) -> Account {
    Account::generate(id)
}

/// A fixed point in time, `ms` milliseconds after 2024-01-01T00:00:00Z.
pub fn at(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_704_067_200_000 + ms).expect("timestamp in range")
}

/// A locked main store using cheap derivation parameters.
pub fn test_main_store(password: &str) -> MainStore {
    let mut store = MainStore::new().with_kdf_params(test_kdf_params());
    store
        .set_password(password)
        .expect("Failed to set password");
    store
}

pub fn test_plain_store(id: &str) -> PlainStore {
    PlainStore::new(id)
}

/// Create a record with the given name and a fixed `updated` timestamp.
pub fn record_at<E: recordvault::store::StoreExtension>(
    store: &recordvault::Store<E>,
    name: &str,
    updated: DateTime<Utc>,
) -> Record {
    let mut record = store.create_record(
        name,
        vec![Field::new("username", name), Field::masked("password", "s3cret")],
        ["test"],
    );
    record.updated = updated;
    record
}

/// Create a shared store owned by a fresh account.
pub fn test_shared_store(owner: &str) -> (SharedStore, Account) {
    let account = test_account(owner);
    let store = SharedStore::create(&account).expect("Failed to create shared store");
    (store, account)
}

/// Sorted snapshot of a store's records for equality checks.
pub fn snapshot<E: recordvault::store::StoreExtension>(store: &recordvault::Store<E>) -> Vec<Record> {
    let mut records: Vec<Record> = store.records().cloned().collect();
    records.sort_by(|a, b| a.id.cmp(&b.id));
    records
}
