use std::sync::atomic::{AtomicU64, Ordering};

/// Returns a process-unique connection id for log correlation and table ownership.
///
/// Ids only need to be unique within one relay process, so a counter is enough.
pub fn next_conn_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}
