use chrono::{Datelike, NaiveDate};

use super::{write_outputs, Standardize};
use crate::config::DateStandardizerConfig;
use crate::model::StandardizedRecord;

/// Parses a free-text date into day, month and year attributes.
#[derive(Debug, Clone)]
pub struct DateStandardizer {
    input_fields: Vec<String>,
    output_fields: Vec<String>,
    formats: Vec<String>,
}

impl DateStandardizer {
    pub fn new(config: &DateStandardizerConfig) -> Self {
        Self {
            input_fields: config.input_fields.as_slice().to_vec(),
            output_fields: config.output_fields.clone(),
            formats: config.parse_formats.clone(),
        }
    }

    /// First format that parses the cleaned text wins. `%Y` formats only
    /// accept four-digit years, so `02 04 85` falls through to `%y`.
    pub fn parse(&self, text: &str) -> Option<NaiveDate> {
        let cleaned = clean_date(text);
        if cleaned.is_empty() {
            return None;
        }
        self.formats.iter().find_map(|fmt| {
            NaiveDate::parse_from_str(&cleaned, fmt)
                .ok()
                .filter(|d| !fmt.contains("%Y") || d.year() >= 1000)
        })
    }
}

impl Standardize for DateStandardizer {
    fn input_fields(&self) -> &[String] {
        &self.input_fields
    }

    fn standardize(&self, values: &[&str], out: &mut StandardizedRecord) {
        let text = values
            .iter()
            .filter(|v| !v.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            return;
        }
        match self.parse(&text) {
            Some(date) => write_outputs(
                out,
                &self.output_fields,
                [
                    format!("{:02}", date.day()),
                    format!("{:02}", date.month()),
                    format!("{:04}", date.year()),
                ],
            ),
            None => tracing::debug!(value = %text, "no date format matched"),
        }
    }
}

/// `/ - . ,` become spaces, runs of whitespace collapse.
fn clean_date(text: &str) -> String {
    text.chars()
        .map(|c| if matches!(c, '/' | '-' | '.' | ',') { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_date_formats, FieldList};

    fn std() -> DateStandardizer {
        DateStandardizer::new(&DateStandardizerConfig {
            input_fields: FieldList(vec!["dob".into()]),
            output_fields: vec!["day".into(), "month".into(), "year".into()],
            parse_formats: default_date_formats(),
        })
    }

    fn run(values: &[&str]) -> StandardizedRecord {
        let mut out = StandardizedRecord::new(0);
        std().standardize(values, &mut out);
        out
    }

    #[test]
    fn separators_are_cleaned() {
        for input in ["02/04/1965", "2-4-1965", "02.04.1965", " 02 , 04 , 1965 "] {
            let out = run(&[input]);
            assert_eq!(out.get("day"), Some("02"), "{input}");
            assert_eq!(out.get("month"), Some("04"), "{input}");
            assert_eq!(out.get("year"), Some("1965"), "{input}");
        }
    }

    #[test]
    fn month_names_and_compact_forms() {
        let s = std();
        assert_eq!(s.parse("12 march 1987"), NaiveDate::from_ymd_opt(1987, 3, 12));
        assert_eq!(s.parse("19870312"), NaiveDate::from_ymd_opt(1987, 3, 12));
        assert_eq!(s.parse("1987-03-12"), NaiveDate::from_ymd_opt(1987, 3, 12));
        assert_eq!(s.parse("02 04 85"), NaiveDate::from_ymd_opt(1985, 4, 2));
    }

    #[test]
    fn first_matching_format_wins() {
        // Ambiguous: day-first is listed before month-first.
        assert_eq!(std().parse("03/04/2001"), NaiveDate::from_ymd_opt(2001, 4, 3));
        // Only month-first fits.
        assert_eq!(std().parse("12/25/2001"), NaiveDate::from_ymd_opt(2001, 12, 25));
    }

    #[test]
    fn separate_fields_are_joined() {
        let out = run(&["7", "11", "1950"]);
        assert_eq!(out.get("day"), Some("07"));
        assert_eq!(out.get("month"), Some("11"));
        assert_eq!(out.get("year"), Some("1950"));
    }

    #[test]
    fn unparseable_leaves_all_missing() {
        assert!(run(&["sometime in spring"]).is_empty());
        assert!(run(&["31/02/1999"]).is_empty());
        assert!(run(&[""]).is_empty());
    }

    #[test]
    fn empty_output_name_drops_slot() {
        let s = DateStandardizer::new(&DateStandardizerConfig {
            input_fields: FieldList(vec!["dob".into()]),
            output_fields: vec!["".into(), "".into(), "birth_year".into()],
            parse_formats: default_date_formats(),
        });
        let mut out = StandardizedRecord::new(0);
        s.standardize(&["1/1/1970"], &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out.get("birth_year"), Some("1970"));
    }
}
