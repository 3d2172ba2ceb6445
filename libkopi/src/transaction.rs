use crate::{BigRational, Location, ParseError};

use chrono::NaiveDate;
use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use std::fmt;

/// Date given to transactions whose header date could not be parsed.
/// Being the smallest representable date, such transactions sort first.
pub const UNPARSED_DATE: NaiveDate = NaiveDate::MIN;

/// One leg of a transaction, `amount` is `None` until balancing fills it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Posting {
    pub account: String,
    pub amount: Option<BigRational>,
}

impl Posting {
    pub fn new(account: impl Into<String>, amount: BigRational) -> Self {
        Self {
            account: account.into(),
            amount: Some(amount),
        }
    }

    pub fn empty(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            amount: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub payee: String,
    pub postings: Vec<Posting>,
    /// Raw comments, leading `;` included, in the order they were read.
    pub comments: Vec<String>,
}

/// Why a transaction could not be balanced.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Imbalance {
    #[error("more than one account change empty")]
    MultipleEmpty,
    #[error("no empty account change to place extra balance")]
    NoEmptyLeg(BigRational),
}

impl Imbalance {
    pub fn at(self, location: Location) -> ParseError {
        match self {
            Imbalance::MultipleEmpty => ParseError::MultipleEmptyLegs { location },
            Imbalance::NoEmptyLeg(imbalance) => ParseError::UnbalancedTransaction {
                location,
                imbalance,
            },
        }
    }
}

impl Transaction {
    pub fn new(date: NaiveDate, payee: impl Into<String>) -> Self {
        Self {
            date,
            payee: payee.into(),
            postings: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Fills the single empty posting with the negated sum of the others.
    ///
    /// Fails when more than one posting is empty, or when none is and the amounts
    /// do not cancel out. Postings are left untouched on failure.
    pub fn balance(&mut self) -> Result<(), Imbalance> {
        let mut sum = BigRational::zero();
        let mut empty = None;

        for (idx, posting) in self.postings.iter().enumerate() {
            match &posting.amount {
                Some(amount) => sum = sum + amount,
                None if empty.is_some() => return Err(Imbalance::MultipleEmpty),
                None => empty = Some(idx),
            }
        }

        match empty {
            Some(idx) => {
                self.postings[idx].amount = Some(-sum);
                Ok(())
            }
            None if sum.is_zero() => Ok(()),
            None => Err(Imbalance::NoEmptyLeg(sum)),
        }
    }

    /// Sum of all specified amounts.
    pub fn total(&self) -> BigRational {
        self.postings
            .iter()
            .filter_map(|p| p.amount.as_ref())
            .fold(BigRational::zero(), |acc, amount| acc + amount)
    }

    pub fn is_balanced(&self) -> bool {
        self.postings.iter().all(|p| p.amount.is_some()) && self.total().is_zero()
    }
}

/// Renders an amount as a plain decimal when it has a finite decimal expansion
/// of reasonable length, `numer/denom` otherwise.
pub(crate) fn format_amount(amount: &BigRational) -> String {
    let ten = BigInt::from(10);
    let mut scale = BigInt::from(1);

    for places in 0..=18usize {
        if (&scale % amount.denom()).is_zero() {
            let digits = (amount.numer() * (&scale / amount.denom())).abs().to_string();
            let digits = format!("{:0>width$}", digits, width = places + 1);
            let (int, frac) = digits.split_at(digits.len() - places);
            let sign = if amount.is_negative() { "-" } else { "" };
            return match places {
                0 => format!("{}{}", sign, int),
                _ => format!("{}{}.{}", sign, int, frac),
            };
        }
        scale *= &ten;
    }

    amount.to_string()
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.date.format("%Y/%m/%d"), self.payee)?;
        for comment in &self.comments {
            writeln!(f, "    {}", comment)?;
        }
        for posting in &self.postings {
            match &posting.amount {
                Some(amount) => writeln!(
                    f,
                    "    {:<50}{:>12}",
                    posting.account,
                    format_amount(amount)
                )?,
                None => writeln!(f, "    {}", posting.account)?,
            }
        }
        Ok(())
    }
}
