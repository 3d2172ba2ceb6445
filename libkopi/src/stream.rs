use crate::parser::{drive, Event, ParseOptions};
use crate::{ParseError, Transaction};

use crossbeam_channel::{bounded, select, Receiver};

use std::io::BufRead;
use std::ops::ControlFlow;
use std::thread;

/// A ledger being parsed on a producer thread.
///
/// Transactions arrive in ledger order on [`transactions`][LedgerStream::transactions],
/// errors on [`errors`][LedgerStream::errors]. Both channels are rendezvous channels,
/// the producer does not read further until the previous handoff was taken. The error
/// channel carries `None` once the input is exhausted, nothing is sent after that.
///
/// A consumer must either drain the stream or drop it. Dropping disconnects both
/// channels and the producer stops at its next handoff; keeping the stream around
/// without reading leaves the producer blocked.
///
/// Iterating selects over both channels, yielding `Err` for each error and ending at
/// the terminal `None`. An erroneous transaction comes right after its error.
pub struct LedgerStream {
    transactions: Receiver<Transaction>,
    errors: Receiver<Option<ParseError>>,
    done: bool,
}

impl LedgerStream {
    pub fn spawn<R>(reader: R, options: ParseOptions) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (txn_tx, transactions) = bounded(0);
        let (err_tx, errors) = bounded(0);

        thread::spawn(move || {
            drive(reader, &options, |event| {
                let sent = match event {
                    Event::Transaction(transaction) => txn_tx.send(transaction).is_ok(),
                    Event::Error(err) => err_tx.send(Some(err)).is_ok(),
                };
                if sent {
                    ControlFlow::Continue(())
                } else {
                    ControlFlow::Break(())
                }
            });
            if err_tx.send(None).is_err() {
                tracing::debug!("ledger stream dropped before its end");
            } else {
                tracing::debug!("ledger stream finished");
            }
        });

        Self {
            transactions,
            errors,
            done: false,
        }
    }

    pub fn transactions(&self) -> &Receiver<Transaction> {
        &self.transactions
    }

    pub fn errors(&self) -> &Receiver<Option<ParseError>> {
        &self.errors
    }
}

impl Iterator for LedgerStream {
    type Item = Result<Transaction, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        select! {
            recv(self.transactions) -> transaction => match transaction {
                Ok(transaction) => Some(Ok(transaction)),
                Err(_) => {
                    self.done = true;
                    None
                }
            },
            recv(self.errors) -> err => match err {
                Ok(Some(err)) => Some(Err(err)),
                Ok(None) | Err(_) => {
                    self.done = true;
                    None
                }
            },
        }
    }
}

/// Streams a ledger with default options, see [`LedgerStream`].
pub fn stream<R>(reader: R) -> LedgerStream
where
    R: BufRead + Send + 'static,
{
    stream_with(reader, ParseOptions::default())
}

pub fn stream_with<R>(reader: R, options: ParseOptions) -> LedgerStream
where
    R: BufRead + Send + 'static,
{
    LedgerStream::spawn(reader, options)
}
