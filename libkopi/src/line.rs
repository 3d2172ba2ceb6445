use crate::parser::{LedgerParser, Rule};
use crate::source;
use crate::transaction::Posting;
use crate::{amount, Location};

use chrono::NaiveDate;
use pest::Parser;

/// Starts a comment, which runs to the end of the line.
pub const COMMENT_MARKER: char = ';';

/// Date formats tried, in order, on a header's date token.
pub const DEFAULT_DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d", "%Y.%m.%d"];

/// One physical line of ledger input.
#[derive(Debug, PartialEq)]
pub enum Line<'l> {
    /// Origin of the lines that follow.
    Marker(Location),
    Blank,
    /// The whole line is a comment.
    Comment(&'l str),
    /// Content read while no transaction is open, with its trailing comment. Space
    /// before the comment is kept.
    Header {
        text: &'l str,
        comment: Option<&'l str>,
    },
    /// Content read while a transaction is open, with its trailing comment.
    Posting {
        text: &'l str,
        comment: Option<&'l str>,
    },
}

/// Classifies a raw line, `open` tells whether a transaction is being assembled.
pub fn classify(raw: &str, open: bool) -> Line<'_> {
    if let Some(payload) = raw.strip_prefix(source::MARKER_PREFIX) {
        return Line::Marker(source::parse_marker(payload));
    }

    let trimmed = raw.trim();
    let (body, comment) = match trimmed.find(COMMENT_MARKER) {
        Some(idx) => (&trimmed[..idx], Some(&trimmed[idx..])),
        None => (trimmed, None),
    };
    let text = body.trim_end();

    match comment {
        _ if !text.is_empty() && open => Line::Posting { text, comment },
        // `2024/01/01 ; note` is a header with an empty payee
        _ if !text.is_empty() => Line::Header {
            text: body,
            comment,
        },
        Some(comment) => Line::Comment(comment),
        None => Line::Blank,
    }
}

/// Splits a header into its date token and payee at the first space.
pub fn split_header(text: &str) -> Option<(&str, &str)> {
    text.split_once(' ').map(|(date, payee)| (date, payee.trim_end()))
}

pub fn parse_date<S: AsRef<str>>(token: &str, formats: &[S]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(token, format.as_ref()).ok())
}

/// Fields of a posting line. Separators are tabs or runs of two or more spaces,
/// so account names may contain single spaces.
pub fn fields(text: &str) -> Vec<&str> {
    match LedgerParser::parse(Rule::posting, text) {
        Ok(pairs) => pairs
            .flat_map(|posting| posting.into_inner())
            .filter(|pair| pair.as_rule() == Rule::field)
            .map(|field| field.as_str().trim())
            .filter(|field| !field.is_empty())
            .collect(),
        Err(_) => vec![text],
    }
}

/// Builds a posting from its line. When the last field is not an amount the whole
/// line names the account and the amount is left for balancing.
pub fn parse_posting(text: &str) -> Posting {
    let fields = fields(text);
    if let Some((last, account)) = fields.split_last() {
        if let Some(amount) = amount::evaluate(last) {
            return Posting::new(account.join(" "), amount);
        }
    }
    Posting::empty(fields.join(" "))
}

#[cfg(test)]
mod tests {
    use crate::line::{classify, fields, parse_date, parse_posting, split_header, Line};
    use crate::line::DEFAULT_DATE_FORMATS;
    use crate::transaction::Posting;
    use crate::{BigRational, Location};
    use chrono::NaiveDate;

    use anyhow::{anyhow, Result};

    #[test]
    fn classify_blank_and_comments() {
        assert_eq!(classify("", false), Line::Blank);
        assert_eq!(classify(" \t ", true), Line::Blank);
        assert_eq!(classify("; a note", false), Line::Comment("; a note"));
        assert_eq!(classify("    ; indented", true), Line::Comment("; indented"));
    }

    #[test]
    fn classify_depends_on_open_transaction() {
        assert_eq!(
            classify("2024/01/01 Coffee ; morning", false),
            Line::Header {
                text: "2024/01/01 Coffee ",
                comment: Some("; morning"),
            }
        );
        assert_eq!(
            classify("2024/01/01 ; morning", false),
            Line::Header {
                text: "2024/01/01 ",
                comment: Some("; morning"),
            }
        );
        assert_eq!(
            classify("2024/01/01 Coffee", true),
            Line::Posting {
                text: "2024/01/01 Coffee",
                comment: None,
            }
        );
        assert_eq!(
            classify("    Assets:Cash    -3.50   ;; paid cash  ", true),
            Line::Posting {
                text: "Assets:Cash    -3.50",
                comment: Some(";; paid cash"),
            }
        );
    }

    #[test]
    fn classify_marker() {
        assert_eq!(
            classify("\0books/food.ledger\042", false),
            Line::Marker(Location::new("books/food.ledger", 42))
        );
    }

    #[test]
    fn header_split() {
        assert_eq!(
            split_header("2024/01/01 Corner Cafe"),
            Some(("2024/01/01", "Corner Cafe"))
        );
        assert_eq!(split_header("2024/01/01 Coffee "), Some(("2024/01/01", "Coffee")));
        assert_eq!(split_header("2024/01/01 "), Some(("2024/01/01", "")));
        assert_eq!(split_header("2024/01/01"), None);
    }

    #[test]
    fn date_grammar() -> Result<()> {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).ok_or(anyhow!("invalid date"))?;
        assert_eq!(parse_date("2024/03/09", DEFAULT_DATE_FORMATS), Some(expected));
        assert_eq!(parse_date("2024-03-09", DEFAULT_DATE_FORMATS), Some(expected));
        assert_eq!(parse_date("2024.03.09", DEFAULT_DATE_FORMATS), Some(expected));
        assert_eq!(parse_date("2024/13/09", DEFAULT_DATE_FORMATS), None);
        assert_eq!(parse_date("yesterday", DEFAULT_DATE_FORMATS), None);
        assert_eq!(parse_date("09/03/2024", &["%d/%m/%Y"]), Some(expected));
        Ok(())
    }

    #[test]
    fn split_posting_fields() {
        assert_eq!(fields("Assets:Cash  -3.50"), vec!["Assets:Cash", "-3.50"]);
        assert_eq!(fields("Assets:Cash\t\t-3.50"), vec!["Assets:Cash", "-3.50"]);
        assert_eq!(
            fields("Expenses:Eating Out    12"),
            vec!["Expenses:Eating Out", "12"]
        );
        assert_eq!(fields("Assets:Cash \t 5"), vec!["Assets:Cash", "5"]);
        assert_eq!(fields("Assets:Cash"), vec!["Assets:Cash"]);
    }

    #[test]
    fn posting_with_and_without_amount() {
        assert_eq!(
            parse_posting("Expenses:Coffee  3.50"),
            Posting::new("Expenses:Coffee", BigRational::new(7.into(), 2.into()))
        );
        assert_eq!(parse_posting("Assets:Cash"), Posting::empty("Assets:Cash"));
        assert_eq!(
            parse_posting("Assets:Cash  USD"),
            Posting::empty("Assets:Cash USD")
        );
        assert_eq!(
            parse_posting("Expenses:Split Bill  (30 / 4)"),
            Posting::new("Expenses:Split Bill", BigRational::new(15.into(), 2.into()))
        );
    }
}
