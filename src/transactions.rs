use std::{fs, marker::PhantomData, path::PathBuf};

/// Undo steps for filesystem changes made while writing generated output.
#[derive(Debug)]
pub enum RollbackOperation {
    RemoveFile(PathBuf),
    RemoveDir(PathBuf),
}
/// Active Transaction
pub struct Active;
/// Committed Transaction
pub struct Committed;
/// A trait that tells us if rollback should occur when dropped.
pub trait TransactionState {
    const SHOULD_ROLLBACK: bool;
}
impl TransactionState for Active {
    const SHOULD_ROLLBACK: bool = true;
}
impl TransactionState for Committed {
    const SHOULD_ROLLBACK: bool = false;
}
/// Tracks what an output write created so a failure leaves nothing behind.
///
/// A `Transaction<Active>` that is dropped, for example because `?` returned early,
/// undoes its operations in reverse order. [`Transaction::commit`] turns it into a
/// `Transaction<Committed>`, which does nothing on drop.
///
/// ```rust,ignore
/// let mut trx = Transaction::<Active>::new();
/// trx.add_operation(RollbackOperation::RemoveFile(tmp.clone()));
/// std::fs::rename(&tmp, &output)?;
/// trx.commit();
/// ```
pub struct Transaction<State: TransactionState> {
    rollback_operations: Vec<RollbackOperation>,
    state: PhantomData<State>,
}
impl Transaction<Active> {
    pub fn new() -> Self {
        Transaction {
            rollback_operations: vec![],
            state: PhantomData,
        }
    }
    /// Registers an undo step, run only if the transaction is never committed.
    pub fn add_operation(&mut self, operation: RollbackOperation) {
        self.rollback_operations.push(operation);
    }
    /// Keeps every change made so far.
    pub fn commit(mut self) -> Transaction<Committed> {
        self.rollback_operations.clear();

        Transaction {
            rollback_operations: vec![],
            state: PhantomData,
        }
    }
}
impl Default for Transaction<Active> {
    fn default() -> Self {
        Self::new()
    }
}
impl<S: TransactionState> Drop for Transaction<S> {
    fn drop(&mut self) {
        if S::SHOULD_ROLLBACK && !self.rollback_operations.is_empty() {
            log::debug!("rolling back {} operations", self.rollback_operations.len());
            while let Some(operation) = self.rollback_operations.pop() {
                match operation {
                    RollbackOperation::RemoveDir(path) => {
                        log::debug!("removing dir: {}", path.display());
                        let _ = fs::remove_dir_all(&path);
                    }
                    RollbackOperation::RemoveFile(path) => {
                        log::debug!("removing file: {}", path.display());
                        let _ = fs::remove_file(&path);
                    }
                }
            }
        }
    }
}
