use std::{fmt::Display, ops::Deref, str::FromStr};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::InputError;

pub const HOURS_PER_YEAR: f64 = 365. * 24.;

const MILLIS_PER_HOUR: f64 = 60. * 60. * 1000.;

/// Yearly income the user entered. Only whole currency units are kept.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnualSalary(f64);

impl AnnualSalary {
    pub fn new_opt(value: f64) -> Option<AnnualSalary> {
        let value = value.trunc();
        if value.is_finite() && value > 0. {
            Some(AnnualSalary(value))
        } else {
            None
        }
    }

    pub fn hourly_rate(&self) -> f64 {
        self.0 / HOURS_PER_YEAR
    }
}

impl Display for AnnualSalary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}", self.0)
    }
}

impl FromStr for AnnualSalary {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s.trim().trim_start_matches('$').replace(',', "");
        cleaned
            .parse::<f64>()
            .ok()
            .and_then(AnnualSalary::new_opt)
            .ok_or_else(|| InputError::InvalidSalary(s.trim().to_string()))
    }
}

impl Deref for AnnualSalary {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Money that a duration is worth. The amount keeps full precision; rounding to cents only
/// happens when it's displayed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoneyEstimate {
    /// No salary was entered yet.
    Unknown,
    Amount(f64),
}

impl MoneyEstimate {
    pub fn amount(&self) -> Option<f64> {
        match self {
            MoneyEstimate::Unknown => None,
            MoneyEstimate::Amount(v) => Some(*v),
        }
    }
}

impl Display for MoneyEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoneyEstimate::Unknown => write!(f, "$?.??"),
            MoneyEstimate::Amount(v) => write!(f, "${v:.2}"),
        }
    }
}

/// `hours × salary / 8760`.
pub fn money_estimate(duration: Duration, salary: Option<AnnualSalary>) -> MoneyEstimate {
    match salary {
        None => MoneyEstimate::Unknown,
        Some(salary) => {
            let hours = duration.num_milliseconds() as f64 / MILLIS_PER_HOUR;
            MoneyEstimate::Amount(hours * salary.hourly_rate())
        }
    }
}
