//! Lock poisoning helpers
//!
//! The listener registry guards its per-plugin sets with `std::sync` locks so that
//! attach/detach calls can be made from synchronous gateway callbacks. A panic in a
//! listener callback while a lock is held poisons it; these helpers turn that into a
//! typed error instead of propagating the panic.

use std::sync::{LockResult, MutexGuard, RwLockReadGuard, RwLockWriteGuard};

fn describe_poison(kind: &str, detail: impl std::fmt::Debug) -> String {
    format!(
        "Internal synchronisation error ({} poisoned). A panic occurred while the lock was held: {:?}",
        kind, detail
    )
}

/// Map a poisoned `Mutex` lock into an application error
pub fn lock_mutex<'a, T, E>(
    result: LockResult<MutexGuard<'a, T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<MutexGuard<'a, T>, E> {
    result.map_err(|poison| error_constructor(describe_poison("mutex", poison)))
}

/// Map a poisoned `RwLock` read into an application error
pub fn read_rwlock<'a, T, E>(
    result: LockResult<RwLockReadGuard<'a, T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockReadGuard<'a, T>, E> {
    result.map_err(|poison| error_constructor(describe_poison("rwlock read", poison)))
}

/// Map a poisoned `RwLock` write into an application error
pub fn write_rwlock<'a, T, E>(
    result: LockResult<RwLockWriteGuard<'a, T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockWriteGuard<'a, T>, E> {
    result.map_err(|poison| error_constructor(describe_poison("rwlock write", poison)))
}
