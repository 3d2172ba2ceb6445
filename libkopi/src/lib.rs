//! Kopi - A plain-text double-entry ledger parser
//! ---
//!
//! Kopi reads blank-line delimited ledgers, one `DATE PAYEE` header followed by
//! indented `ACCOUNT  [AMOUNT]` postings, and turns them into balanced transactions
//! with exact rational amounts. At most one posting per transaction may leave its
//! amount out, it receives whatever balances the rest.
//!
//! ```text
//! 2024/01/01 Coffee ; morning
//!     Expenses:Coffee    3.50
//!     Assets:Cash
//! ```
//!
//! Two delivery modes are available: [`parse`] collects the whole ledger and sorts it by
//! date, failing on the first error, while [`stream`] hands transactions over one at a
//! time from a producer thread and reports errors on a separate channel.

extern crate pest;
#[macro_use]
extern crate pest_derive;

use std::fmt;

/// Amount tokens, exact literals and parenthesised expressions.
pub mod amount;

mod ledger;

/// Per-line classification of ledger input.
pub mod line;

/// Our main parser entrypoints.
pub mod parser;

/// Marker lines and multi-file ledgers.
pub mod source;

/// Streaming delivery over a producer thread.
pub mod stream;

mod transaction;

pub use num_rational::BigRational;
pub use parser::{parse, parse_str, parse_with, ParseOptions};
pub use stream::{stream, stream_with, LedgerStream};
pub use transaction::{Imbalance, Posting, Transaction, UNPARSED_DATE};

/// Where a line came from: the source name adopted from the last marker line,
/// and the line number within that source.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    pub source: String,
    pub line: usize,
}

impl Location {
    pub fn new(source: impl Into<String>, line: usize) -> Self {
        Self {
            source: source.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.line)
    }
}

/// Contextual error for the ledger parser.
/// Every variant knows the [`Location`] it was raised at.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("{location}: unable to parse payee line: {line}")]
    MalformedHeader { location: Location, line: String },

    #[error("{location}: unable to parse date: {date}")]
    UnparsableDate { location: Location, date: String },

    #[error("{location}: unable to balance transaction, more than one account change empty")]
    MultipleEmptyLegs { location: Location },

    #[error("{location}: unable to balance transaction, no empty account change to place extra balance (off by {imbalance})")]
    UnbalancedTransaction {
        location: Location,
        imbalance: BigRational,
    },

    #[error("{location}: unable to read ledger: {message}")]
    Read { location: Location, message: String },
}

impl ParseError {
    pub fn location(&self) -> &Location {
        match self {
            ParseError::MalformedHeader { location, .. }
            | ParseError::UnparsableDate { location, .. }
            | ParseError::MultipleEmptyLegs { location }
            | ParseError::UnbalancedTransaction { location, .. }
            | ParseError::Read { location, .. } => location,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{BigRational, Location, ParseError};

    #[test]
    fn error_messages_carry_location() {
        let err = ParseError::UnparsableDate {
            location: Location::new("books/2024.ledger", 12),
            date: "2024/13/01".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "books/2024.ledger:12: unable to parse date: 2024/13/01"
        );
        assert_eq!(err.location().line, 12);

        let err = ParseError::UnbalancedTransaction {
            location: Location::new("<input>", 3),
            imbalance: BigRational::new(101.into(), 2.into()),
        };
        assert_eq!(
            format!("{}", err),
            "<input>:3: unable to balance transaction, no empty account change to place extra balance (off by 101/2)"
        );
    }
}
