use crate::transaction::{Imbalance, Posting, Transaction};
use crate::Location;

/// A transaction that has just been closed, along with its balancing outcome.
#[derive(Debug)]
pub(crate) struct Closed {
    pub transaction: Transaction,
    pub opened_at: Location,
    pub balance: Result<(), Imbalance>,
}

/// Accumulates postings and comments of the transaction being read.
#[derive(Debug, Default)]
pub(crate) enum Assembler {
    #[default]
    Idle,
    Open {
        transaction: Transaction,
        opened_at: Location,
    },
}

impl Assembler {
    pub fn is_open(&self) -> bool {
        matches!(self, Assembler::Open { .. })
    }

    /// Starts assembling `transaction`. Headers are only read while idle, a transaction
    /// is only ever closed by a blank line or the end of input.
    pub fn open(&mut self, transaction: Transaction, opened_at: Location) {
        debug_assert!(!self.is_open(), "transaction opened twice");
        *self = Assembler::Open {
            transaction,
            opened_at,
        };
    }

    pub fn post(&mut self, posting: Posting) {
        if let Assembler::Open { transaction, .. } = self {
            transaction.postings.push(posting);
        }
    }

    /// Records a comment, returns false when there is no transaction to take it.
    pub fn comment(&mut self, comment: &str) -> bool {
        match self {
            Assembler::Open { transaction, .. } => {
                transaction.comments.push(comment.to_string());
                true
            }
            Assembler::Idle => false,
        }
    }

    /// Balances and hands out the open transaction, going back to idle.
    pub fn close(&mut self) -> Option<Closed> {
        match std::mem::take(self) {
            Assembler::Idle => None,
            Assembler::Open {
                mut transaction,
                opened_at,
            } => {
                let balance = transaction.balance();
                Some(Closed {
                    transaction,
                    opened_at,
                    balance,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ledger::Assembler;
    use crate::transaction::{Imbalance, Posting, Transaction};
    use crate::{BigRational, Location};
    use chrono::NaiveDate;

    use anyhow::{anyhow, Result};

    fn lunch() -> Result<Transaction> {
        let date = NaiveDate::from_ymd_opt(2023, 8, 17).ok_or(anyhow!("invalid date"))?;
        Ok(Transaction::new(date, "Lunch"))
    }

    #[test]
    fn idle_ignores_everything_but_open() {
        let mut assembler = Assembler::default();
        assert!(!assembler.is_open());
        assert!(!assembler.comment("; stray"));
        assembler.post(Posting::empty("Assets:Cash"));
        assert!(assembler.close().is_none());
    }

    #[test]
    fn open_post_close() -> Result<()> {
        let mut assembler = Assembler::default();
        assembler.open(lunch()?, Location::new("<input>", 3));
        assert!(assembler.is_open());

        assembler.post(Posting::new("Expenses:Food", BigRational::from_integer(12.into())));
        assert!(assembler.comment("; with team"));
        assembler.post(Posting::empty("Liabilities:Card"));

        let closed = assembler.close().ok_or(anyhow!("nothing closed"))?;
        assert!(!assembler.is_open());
        assert_eq!(closed.opened_at, Location::new("<input>", 3));
        assert_eq!(closed.balance, Ok(()));
        assert_eq!(closed.transaction.comments, vec!["; with team"]);
        assert_eq!(
            closed.transaction.postings[1].amount,
            Some(BigRational::from_integer((-12).into()))
        );
        Ok(())
    }

    #[test]
    fn close_reports_imbalance() -> Result<()> {
        let mut assembler = Assembler::default();
        assembler.open(lunch()?, Location::new("<input>", 1));
        assembler.post(Posting::empty("Expenses:Food"));
        assembler.post(Posting::empty("Assets:Cash"));

        let closed = assembler.close().ok_or(anyhow!("nothing closed"))?;
        assert_eq!(closed.balance, Err(Imbalance::MultipleEmpty));
        assert_eq!(closed.transaction.postings.len(), 2);
        Ok(())
    }
}
