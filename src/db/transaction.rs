/*!
 * Unit of work
 *
 * Wraps a database transaction together with a rollback-only flag. Code
 * running inside the unit of work can veto the commit without owning the
 * transaction; whoever began it decides the outcome through `finish`.
 */

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Type alias for boxed future used in unit-of-work scopes
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionOutcome {
    Committed,
    RolledBack,
}

pub struct UnitOfWork {
    id: Uuid,
    txn: DatabaseTransaction,
    rollback_only: AtomicBool,
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.id)
            .field("rollback_only", &self.is_rollback_only())
            .finish()
    }
}

impl UnitOfWork {
    /// Begins a new transaction on `db`.
    pub async fn begin(db: &DatabaseConnection) -> Result<Self, ServiceError> {
        let txn = db.begin().await?;
        Ok(Self::from_transaction(txn))
    }

    pub fn from_transaction(txn: DatabaseTransaction) -> Self {
        let id = Uuid::new_v4();
        debug!(unit_of_work = %id, "Unit of work started");
        Self {
            id,
            txn,
            rollback_only: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Connection to run statements on; everything goes through the
    /// wrapped transaction.
    pub fn connection(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Marks the unit of work so that `finish` rolls it back.
    pub fn set_rollback_only(&self) {
        if !self.rollback_only.swap(true, Ordering::SeqCst) {
            warn!(unit_of_work = %self.id, "Unit of work marked rollback-only");
        }
    }

    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only.load(Ordering::SeqCst)
    }

    /// Commits, or rolls back when the unit of work was marked rollback-only.
    pub async fn finish(self) -> Result<TransactionOutcome, ServiceError> {
        if self.is_rollback_only() {
            self.rollback().await?;
            return Ok(TransactionOutcome::RolledBack);
        }
        let id = self.id;
        self.txn.commit().await?;
        debug!(unit_of_work = %id, "Unit of work committed");
        Ok(TransactionOutcome::Committed)
    }

    pub async fn rollback(self) -> Result<(), ServiceError> {
        let id = self.id;
        self.txn.rollback().await?;
        debug!(unit_of_work = %id, "Unit of work rolled back");
        Ok(())
    }
}

/// Runs `f` inside a fresh unit of work.
///
/// On `Ok` the unit of work is finished (committed unless marked
/// rollback-only); on `Err` it is rolled back and the error returned.
///
/// # Example
///
/// ```rust,ignore
/// let (document, outcome) = with_unit_of_work(&db, |uow| {
///     Box::pin(async move { builder.build(uow).await })
/// })
/// .await?;
/// ```
pub async fn with_unit_of_work<F, T>(
    db: &DatabaseConnection,
    f: F,
) -> Result<(T, TransactionOutcome), ServiceError>
where
    F: for<'a> FnOnce(&'a UnitOfWork) -> BoxFuture<'a, Result<T, ServiceError>>,
{
    let uow = UnitOfWork::begin(db).await?;
    match f(&uow).await {
        Ok(value) => {
            let outcome = uow.finish().await?;
            Ok((value, outcome))
        }
        Err(e) => {
            if let Err(rollback_err) = uow.rollback().await {
                warn!("Rollback after failure did not complete: {}", rollback_err);
            }
            Err(e)
        }
    }
}
