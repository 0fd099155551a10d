use std::fmt::Display;

use ansi_term::{Colour, Style};
use chrono::{DateTime, Utc};

use crate::{
    accounting::{
        money::{money_estimate, MoneyEstimate},
        projected_total, Mode,
    },
    storage::entities::PersistedState,
    utils::time::format_time,
};

/// What the popup shows about money at a given moment.
#[derive(Debug, Clone, PartialEq)]
pub struct MoneyCard {
    pub title: &'static str,
    pub amount: MoneyEstimate,
    pub subtitle: String,
    /// Money is being lost rather than saved.
    pub losing: bool,
    /// No salary yet, so the card only asks for one.
    pub needs_setup: bool,
}

impl MoneyCard {
    /// Derives the card from `state` at `now`. Nothing is stored.
    pub fn project(state: &PersistedState, now: DateTime<Utc>) -> Self {
        if state.annual_salary.is_none() {
            return Self {
                title: "TRACK YOUR SAVINGS",
                amount: MoneyEstimate::Unknown,
                subtitle: "Set your salary to see the impact".into(),
                losing: false,
                needs_setup: true,
            };
        }

        let mode = Mode::active(state);
        let total = projected_total(mode, state, now);
        let amount = money_estimate(total, state.annual_salary);
        match mode {
            Mode::Saved => Self {
                title: "MONEY SAVED",
                amount,
                subtitle: format!("{} of productive time", format_time(total)),
                losing: false,
                needs_setup: false,
            },
            Mode::Wasted => Self {
                title: "MONEY LOST",
                amount,
                subtitle: format!("{} wasted on scrolling", format_time(total)),
                losing: true,
                needs_setup: false,
            },
        }
    }
}

impl Display for MoneyCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let accent = if self.losing {
            Colour::Red
        } else {
            Colour::Green
        };
        writeln!(f, "{}", Style::new().bold().paint(self.title))?;
        writeln!(f, "{}", accent.bold().paint(self.amount.to_string()))?;
        write!(f, "{}", self.subtitle)?;
        if self.needs_setup {
            write!(f, "\n{}", Colour::Cyan.paint("Run `feedblock salary <amount>`"))?;
        }
        Ok(())
    }
}

/// One line summary of where blocking stands.
pub fn status_line(state: &PersistedState) -> String {
    if state.enabled {
        Colour::Green.bold().paint("Feed blocking is ON").to_string()
    } else {
        Colour::Red.bold().paint("Feed blocking is OFF").to_string()
    }
}
