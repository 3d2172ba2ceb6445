use crate::ledger::{Assembler, Closed};
use crate::line::{self, Line, DEFAULT_DATE_FORMATS};
use crate::transaction::{Transaction, UNPARSED_DATE};
use crate::{Location, ParseError};

use std::borrow::Cow;
use std::io::BufRead;
use std::ops::ControlFlow;

#[derive(Parser)]
#[grammar = "ledger.pest"]
pub struct LedgerParser;

/// Per-parse settings. Nothing here is shared between parses.
#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Source name reported in errors until a marker line says otherwise.
    pub source_name: String,
    /// chrono formats tried in order on header dates.
    pub date_formats: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            source_name: "<input>".to_string(),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    pub fn with_date_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.date_formats = formats.into_iter().map(Into::into).collect();
        self
    }
}

/// What the driver hands to its sink.
#[derive(Debug)]
pub(crate) enum Event {
    Transaction(Transaction),
    Error(ParseError),
}

macro_rules! emit {
    ($sink:ident, $event:expr) => {
        if $sink($event).is_break() {
            return;
        }
    };
}

fn finish<F>(closed: Closed, sink: &mut F) -> ControlFlow<()>
where
    F: FnMut(Event) -> ControlFlow<()>,
{
    let Closed {
        transaction,
        opened_at,
        balance,
    } = closed;

    if let Err(imbalance) = balance {
        if sink(Event::Error(imbalance.at(opened_at))).is_break() {
            return ControlFlow::Break(());
        }
    }
    tracing::trace!(date = %transaction.date, payee = %transaction.payee, "transaction closed");
    sink(Event::Transaction(transaction))
}

/// One line without its terminator. Bytes that are not UTF-8 become U+FFFD.
fn decode_line(buf: &[u8]) -> Cow<'_, str> {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line)
}

/// Runs every line of `reader` through classification, assembly and balancing.
///
/// Transactions and errors go to `sink` in the order they happen. An erroneous
/// transaction is still handed over, right after its error. Parsing goes on until the
/// input ends, a read fails, or `sink` breaks. Invalid UTF-8 is not a read failure,
/// see [`decode_line`].
pub(crate) fn drive<R, F>(mut reader: R, options: &ParseOptions, mut sink: F)
where
    R: BufRead,
    F: FnMut(Event) -> ControlFlow<()>,
{
    let mut cursor = Location::new(options.source_name.clone(), 0);
    let mut assembler = Assembler::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                cursor.line += 1;
                emit!(
                    sink,
                    Event::Error(ParseError::Read {
                        location: cursor,
                        message: err.to_string(),
                    })
                );
                return;
            }
        }
        let raw = decode_line(&buf);

        let classified = match line::classify(&raw, assembler.is_open()) {
            Line::Marker(location) => {
                tracing::debug!(%location, "switching source");
                cursor = location;
                continue;
            }
            classified => classified,
        };
        cursor.line += 1;
        if let Cow::Owned(_) = &raw {
            tracing::warn!(location = %cursor, "invalid UTF-8 replaced");
        }

        let comment = match classified {
            Line::Marker(_) => None,
            Line::Blank => {
                if let Some(closed) = assembler.close() {
                    if finish(closed, &mut sink).is_break() {
                        return;
                    }
                }
                None
            }
            Line::Comment(comment) => Some(comment),
            Line::Header { text, comment } => {
                let Some((date, payee)) = line::split_header(text) else {
                    emit!(
                        sink,
                        Event::Error(ParseError::MalformedHeader {
                            location: cursor.clone(),
                            line: raw.to_string(),
                        })
                    );
                    continue;
                };
                let date = match line::parse_date(date, options.date_formats.as_slice()) {
                    Some(date) => date,
                    None => {
                        emit!(
                            sink,
                            Event::Error(ParseError::UnparsableDate {
                                location: cursor.clone(),
                                date: date.to_string(),
                            })
                        );
                        UNPARSED_DATE
                    }
                };
                assembler.open(Transaction::new(date, payee), cursor.clone());
                comment
            }
            Line::Posting { text, comment } => {
                assembler.post(line::parse_posting(text));
                comment
            }
        };

        if let Some(comment) = comment {
            if !assembler.comment(comment) {
                tracing::debug!(location = %cursor, comment, "dropping comment outside of a transaction");
            }
        }
    }

    if let Some(closed) = assembler.close() {
        let _ = finish(closed, &mut sink);
    }
}

/// Parses a whole ledger, see [`parse_with`].
pub fn parse<R: BufRead>(reader: R) -> Result<Vec<Transaction>, ParseError> {
    parse_with(reader, &ParseOptions::default())
}

pub fn parse_str(input: &str) -> Result<Vec<Transaction>, ParseError> {
    parse(input.as_bytes())
}

/// Parses a whole ledger and returns its transactions sorted by date. Transactions
/// sharing a date keep their order of appearance.
///
/// Stops at the first error and returns it alone.
pub fn parse_with<R: BufRead>(
    reader: R,
    options: &ParseOptions,
) -> Result<Vec<Transaction>, ParseError> {
    let mut ledger = Vec::new();
    let mut failure = None;

    drive(reader, options, |event| match event {
        Event::Transaction(transaction) => {
            ledger.push(transaction);
            ControlFlow::Continue(())
        }
        Event::Error(err) => {
            failure = Some(err);
            ControlFlow::Break(())
        }
    });

    if let Some(err) = failure {
        return Err(err);
    }
    ledger.sort_by_key(|transaction| transaction.date);
    Ok(ledger)
}
