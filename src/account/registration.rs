//! Registration numbers.
//!
//! A registration number reads `<degree><branch><yy><sequence>`, ex.
//! `101230004` is the 4th profile completed for the 2023 admission year,
//! a B.Tech in CSE.

use std::fmt::Display;

use alumni_shared::profile::{Branch, Degree};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::Error;

/// The largest sequence a year can reach.
pub const MAX_SEQUENCE: u16 = 9999;

const SEQUENCE_DIGITS: usize = 4;

/// One-digit code of a degree.
pub fn degree_code(degree: Degree) -> &'static str {
    match degree {
        Degree::BTech => "1",
        Degree::BDes => "2",
        Degree::MTech => "3",
        Degree::MDes => "4",
        Degree::PhD => "5",
    }
}

/// Two-digit code of a branch.
pub fn branch_code(branch: Branch) -> &'static str {
    match branch {
        Branch::NotApplicable => "00",
        Branch::Cse => "01",
        Branch::Ece => "02",
        Branch::Me => "03",
        Branch::Mt => "04",
        Branch::Ns => "05",
        Branch::Ds => "06",
        Branch::Sm => "07",
    }
}

/// The academic programme a profile belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Programme {
    pub degree: Degree,
    pub branch: Branch,
    pub year_of_admission: u16,
}

impl Programme {
    /// Parses a programme from form values.
    ///
    /// # Errors
    ///
    /// - Errors if the degree or the branch is unknown.
    /// - Errors if the admission year doesn't have 4 digits.
    pub fn parse(degree: &str, branch: &str, year_of_admission: u16) -> Result<Self, Error> {
        let degree = degree
            .parse::<Degree>()
            .map_err(|err| Error::InvalidInput(format!("{err}")))?;
        let branch = branch
            .parse::<Branch>()
            .map_err(|err| Error::InvalidInput(format!("{err}")))?;
        if !(1000..=9999).contains(&year_of_admission) {
            return Err(Error::InvalidInput(format!(
                "admission year {year_of_admission} is not a 4-digit year"
            )));
        }
        Ok(Self {
            degree,
            branch,
            year_of_admission,
        })
    }
}

/// A registration number.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Hash)]
#[serde(transparent)]
pub struct RegistrationNumber(String);

impl RegistrationNumber {
    /// Formats a registration number.
    ///
    /// # Errors
    ///
    /// - Errors if `sequence` is `0` or larger than [`MAX_SEQUENCE`].
    pub fn new(programme: Programme, sequence: u16) -> Result<Self, Error> {
        if sequence == 0 || sequence > MAX_SEQUENCE {
            return Err(Error::SequenceExhausted(programme.year_of_admission));
        }
        Ok(Self(format!(
            "{}{}{:02}{:0width$}",
            degree_code(programme.degree),
            branch_code(programme.branch),
            programme.year_of_admission % 100,
            sequence,
            width = SEQUENCE_DIGITS,
        )))
    }

    /// The sequence part, which is the last 4 digits.
    pub fn sequence(&self) -> Option<u16> {
        self.0
            .len()
            .checked_sub(SEQUENCE_DIGITS)
            .and_then(|start| self.0.get(start..))
            .and_then(|digits| digits.parse().ok())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RegistrationNumber {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Per admission year sequence counters.
///
/// Each year continues from the highest sequence it has seen, so existing
/// numbers must be [observed](Self::observe) before new ones are
/// [taken](Self::next).
#[derive(Debug, Default)]
pub struct Sequences {
    years: DashMap<u16, u16>,
}

impl Sequences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an existing registration number.
    pub fn observe(&self, year: u16, sequence: u16) {
        let mut last = self.years.entry(year).or_insert(0);
        *last = (*last).max(sequence);
    }

    /// Takes the next sequence of a year, starting from `1`.
    ///
    /// Callers of the same year are serialized by the map entry lock.
    ///
    /// # Errors
    ///
    /// - Errors if the year already reached [`MAX_SEQUENCE`].
    pub fn next(&self, year: u16) -> Result<u16, Error> {
        let mut last = self.years.entry(year).or_insert(0);
        if *last >= MAX_SEQUENCE {
            return Err(Error::SequenceExhausted(year));
        }
        *last += 1;
        Ok(*last)
    }

    /// The last sequence taken in a year, if any.
    pub fn last(&self, year: u16) -> Option<u16> {
        self.years.get(&year).map(|l| *l)
    }
}
