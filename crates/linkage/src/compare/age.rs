use chrono::NaiveDate;
use tracing::debug;

use super::Weights;
use crate::config::ComparatorMethod;
use crate::error::LinkageError;

/// Compares dates given as `(day, month, year)` attribute triples by the
/// relative difference of the ages they imply on a reference date.
///
/// A side configured without fields compares as `fix_date` itself; a side
/// with fields but a missing or invalid component yields the missing weight.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeComparator {
    pub day: Weights,
    pub month: Weights,
    pub year: Weights,
    pub max_perc_diff: f64,
    pub fix_date: NaiveDate,
}

impl AgeComparator {
    pub fn from_config(method: &ComparatorMethod, missing: f64) -> Result<Self, LinkageError> {
        let ComparatorMethod::Age {
            m_probability_day,
            u_probability_day,
            m_probability_month,
            u_probability_month,
            m_probability_year,
            u_probability_year,
            max_perc_diff,
            fix_date,
        } = method
        else {
            return Err(LinkageError::ConfigValidation(format!(
                "expected an age comparator, got {}",
                method.kind()
            )));
        };
        Ok(Self {
            day: Weights::from_probabilities(*m_probability_day, *u_probability_day, missing),
            month: Weights::from_probabilities(*m_probability_month, *u_probability_month, missing),
            year: Weights::from_probabilities(*m_probability_year, *u_probability_year, missing),
            max_perc_diff: *max_perc_diff,
            fix_date: fix_date.resolve(),
        })
    }

    /// Component weights summed into one agree/disagree pair.
    pub fn weights(&self) -> Weights {
        Weights {
            agree: self.day.agree + self.month.agree + self.year.agree,
            disagree: self.day.disagree + self.month.disagree + self.year.disagree,
            missing: self.day.missing,
        }
    }

    pub fn compare(&self, a: &[Option<String>], b: &[Option<String>]) -> f64 {
        let weights = self.weights();
        let (Some(da), Some(db)) = (self.side_date(a), self.side_date(b)) else {
            return weights.missing;
        };
        if da == db {
            return weights.agree;
        }
        let age_a = (self.fix_date - da).num_days();
        let age_b = (self.fix_date - db).num_days();
        let largest = age_a.abs().max(age_b.abs());
        let perc = 100.0 * (age_a - age_b).abs() as f64 / largest as f64;
        weights.partial(perc / self.max_perc_diff)
    }

    fn side_date(&self, parts: &[Option<String>]) -> Option<NaiveDate> {
        if parts.is_empty() {
            return Some(self.fix_date);
        }
        date(parts)
    }
}

fn date(parts: &[Option<String>]) -> Option<NaiveDate> {
    let [Some(day), Some(month), Some(year)] = parts else {
        return None;
    };
    let parsed = (|| {
        NaiveDate::from_ymd_opt(
            year.trim().parse().ok()?,
            month.trim().parse().ok()?,
            day.trim().parse().ok()?,
        )
    })();
    if parsed.is_none() {
        debug!(day, month, year, "invalid date components treated as missing");
    }
    parsed
}
