//! # Invoice Number Allocation
//!
//! ```text
//!   checkout A ──┐                         ┌── permit held ──┐
//!   checkout B ──┼──► Mutex ──► permit ──► │ BEGIN           │
//!   checkout C ──┘    (FIFO)               │ SELECT numbers  │
//!                                          │ max + 1         │
//!                                          │ INSERT invoice  │ ◄── UNIQUE(number)
//!                                          │ COMMIT          │
//!                                          └─────────────────┘
//! ```
//!
//! Within one process the mutex makes allocation strictly sequential.
//! Another process on the same database file is only stopped by the
//! UNIQUE index; the loser sees a duplicate-number error and retries with
//! a fresh read, at most [`MAX_ALLOCATION_ATTEMPTS`] times.

use sqlx::SqliteConnection;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::EngineResult;
use mizan_core::next_invoice_number;
use mizan_db::InvoiceRepository;

pub const MAX_ALLOCATION_ATTEMPTS: u32 = 3;

#[derive(Debug, Default)]
pub struct InvoiceNumberAllocator {
    lock: Mutex<()>,
}

/// Proof that the caller holds the allocation lock.
///
/// Numbers can only be read through a permit, and the permit must outlive
/// the transaction that inserts the invoice.
#[derive(Debug)]
pub struct AllocationPermit<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl InvoiceNumberAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for every earlier checkout to commit or roll back.
    pub async fn acquire(&self) -> AllocationPermit<'_> {
        AllocationPermit {
            _guard: self.lock.lock().await,
        }
    }
}

impl AllocationPermit<'_> {
    /// Next number as seen by `conn`, which should be the transaction the
    /// invoice will be inserted in.
    pub async fn next_number(&self, conn: &mut SqliteConnection) -> EngineResult<String> {
        let numbers = InvoiceRepository::list_numbers_in(conn).await?;
        Ok(next_invoice_number(numbers.iter().map(String::as_str)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mizan_db::{Database, DbConfig};

    #[tokio::test]
    async fn test_first_number_is_one() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let allocator = InvoiceNumberAllocator::new();

        let permit = allocator.acquire().await;
        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(permit.next_number(&mut conn).await.unwrap(), "1");
    }

    #[tokio::test]
    async fn test_second_acquire_waits_for_first() {
        let allocator = InvoiceNumberAllocator::new();
        let permit = allocator.acquire().await;

        assert!(allocator.lock.try_lock().is_err());
        drop(permit);
        assert!(allocator.lock.try_lock().is_ok());
    }
}
