//! Personal-name standardization, rule-based or HMM.

use std::collections::HashSet;
use std::sync::Arc;

use super::tokens::{TagScheme, Token, TokenPipeline};
use super::{decode, write_outputs, SlotWriter, Standardize, Target, NAME_SLOTS};
use crate::config::NameStandardizerConfig;
use crate::error::LinkageError;
use crate::hmm::HmmModel;
use crate::model::StandardizedRecord;
use crate::resources::Resources;

const TITLE: usize = 0;
const GIVEN: usize = 2;
const ALT_GIVEN: usize = 3;
const SURNAME: usize = 4;
const ALT_SURNAME: usize = 5;

#[derive(Debug, Clone)]
pub enum NameMethod {
    Rules,
    Hmm(Arc<HmmModel>),
}

#[derive(Debug, Clone)]
pub struct NameStandardizer {
    input_fields: Vec<String>,
    output_fields: Vec<String>,
    tokens: TokenPipeline,
    method: NameMethod,
    male_titles: HashSet<String>,
    female_titles: HashSet<String>,
    separator: String,
    rubbish_field: Option<String>,
}

/// Name components before they are written out.
#[derive(Debug, Default, PartialEq)]
struct NameParts {
    titles: Vec<String>,
    given: Vec<String>,
    alt_given: Vec<String>,
    surname: Vec<String>,
    alt_surname: Vec<String>,
    rubbish: Vec<String>,
    /// Tags of every primary given-name token.
    given_tags: Vec<Vec<String>>,
}

impl NameStandardizer {
    pub fn assemble(
        config: &NameStandardizerConfig,
        method: NameMethod,
        resources: &Resources,
    ) -> Result<Self, LinkageError> {
        let lookup = resources.lookup_table(&config.lookup_table)?;
        let corrections = config
            .correction_list
            .as_deref()
            .map(|name| resources.correction_list(name))
            .transpose()?;
        let lower = |v: &[String]| -> HashSet<String> {
            v.iter().map(|t| t.trim().to_lowercase()).collect()
        };
        Ok(Self {
            input_fields: config.input_fields.as_slice().to_vec(),
            output_fields: config.output_fields.clone(),
            tokens: TokenPipeline::new(lookup, corrections, TagScheme::Name, config.check_word_spill),
            method,
            male_titles: lower(&config.male_titles),
            female_titles: lower(&config.female_titles),
            separator: config.field_separator.clone(),
            rubbish_field: config.rubbish_field.clone(),
        })
    }

    fn gender(&self, parts: &NameParts) -> &'static str {
        for title in &parts.titles {
            if self.male_titles.contains(title) {
                return "male";
            }
            if self.female_titles.contains(title) {
                return "female";
            }
        }
        let has = |tag: &str| parts.given_tags.iter().any(|tags| tags.iter().any(|t| t == tag));
        match (has("GM"), has("GF")) {
            (true, false) => "male",
            (false, true) => "female",
            _ => "",
        }
    }

    fn parse_hmm(&self, hmm: &HmmModel, fields: Vec<Vec<Token>>) -> NameParts {
        let tokens = TokenPipeline::flatten(fields);
        let mut parts = NameParts::default();
        if tokens.is_empty() {
            return parts;
        }
        let decoded = decode(hmm, &tokens);
        let mut writer = SlotWriter::new(NAME_SLOTS.len());
        for (i, token) in tokens.iter().enumerate() {
            let text = token
                .entries
                .get(decoded.choice[i])
                .map_or(token.original.as_str(), |e| e.canonical.as_str());
            let target = name_target(hmm.state_name(decoded.states[i]));
            writer.push(target, text);
            match target {
                Target::Slot(TITLE) => parts.titles.push(text.to_string()),
                Target::Slot(GIVEN) if text != "-" => {
                    parts.given_tags.push(token.tags().map(str::to_string).collect())
                }
                _ => {}
            }
        }
        let slot = |i: usize| vec![writer.slot(i, &self.separator)];
        parts.given = slot(GIVEN);
        parts.alt_given = slot(ALT_GIVEN);
        parts.surname = slot(SURNAME);
        parts.alt_surname = slot(ALT_SURNAME);
        parts.rubbish = vec![writer.rubbish(&self.separator)];
        parts
    }
}

impl Standardize for NameStandardizer {
    fn input_fields(&self) -> &[String] {
        &self.input_fields
    }

    fn standardize(&self, values: &[&str], out: &mut StandardizedRecord) {
        let fields = self.tokens.tag_fields(values);
        let parts = match &self.method {
            NameMethod::Rules => parse_rules(fields),
            NameMethod::Hmm(hmm) => self.parse_hmm(hmm, fields),
        };
        let sep = self.separator.as_str();
        write_outputs(
            out,
            &self.output_fields,
            [
                parts.titles.join(sep),
                self.gender(&parts).to_string(),
                parts.given.join(sep),
                parts.alt_given.join(sep),
                parts.surname.join(sep),
                parts.alt_surname.join(sep),
            ],
        );
        if let Some(field) = &self.rubbish_field {
            out.set(field, parts.rubbish.join(sep));
        }
    }
}

fn name_target(state: &str) -> Target {
    match state {
        "titl" => Target::Slot(TITLE),
        "gname1" | "gname2" | "ghyph" => Target::Slot(GIVEN),
        "agname1" | "agname2" => Target::Slot(ALT_GIVEN),
        "sname1" | "sname2" | "pref1" | "pref2" | "shyph" => Target::Slot(SURNAME),
        "asname1" | "asname2" => Target::Slot(ALT_SURNAME),
        "baby" | "knwn" | "andor" | "gopbr" | "gclbr" | "sopbr" | "sclbr" | "coma" => Target::Drop,
        _ => Target::Rubbish,
    }
}

// ---------------------------------------------------------------------------
// Rule grammar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Word {
    text: String,
    tags: Vec<String>,
}

impl Word {
    fn from_token(token: &Token, prefix: &str) -> Self {
        Self {
            text: format!("{prefix}{}", token.canonical()),
            tags: token.tags().map(str::to_string).collect(),
        }
    }

    /// Tagged as a given name and nothing else.
    fn given_only(&self) -> bool {
        !self.tags.is_empty() && self.tags.iter().all(|t| t == "GF" || t == "GM")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Primary,
    /// After `and`, `or`, `aka`, `known as`.
    Alt,
    /// After `nee`, `born`.
    Nee,
    /// Inside parentheses.
    Paren,
}

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Word(Word),
    Hyphen,
    Comma,
    Switch(Role),
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Word(Word, Role),
    Comma,
}

fn parse_rules(mut fields: Vec<Vec<Token>>) -> NameParts {
    let mut parts = NameParts::default();
    for extra in fields.iter().skip(2) {
        parts.rubbish.extend(extra.iter().map(|t| t.original.clone()));
    }
    fields.truncate(2);

    let pieces: Vec<Vec<Piece>> = fields
        .iter()
        .map(|f| assign_roles(join_hyphens(classify(f, &mut parts))))
        .collect();

    match pieces.as_slice() {
        [given, surname] => {
            for piece in given {
                match piece {
                    Piece::Word(w, Role::Primary) => parts.push_given(w),
                    Piece::Word(w, Role::Nee) => parts.alt_surname.push(w.text.clone()),
                    Piece::Word(w, _) => parts.alt_given.push(w.text.clone()),
                    Piece::Comma => parts.rubbish.push(",".into()),
                }
            }
            for piece in surname {
                match piece {
                    Piece::Word(w, Role::Primary) => parts.surname.push(w.text.clone()),
                    Piece::Word(w, _) => parts.alt_surname.push(w.text.clone()),
                    Piece::Comma => parts.rubbish.push(",".into()),
                }
            }
        }
        [single] => match single.iter().position(|p| *p == Piece::Comma) {
            Some(comma) => {
                for piece in &single[..comma] {
                    match piece {
                        Piece::Word(w, Role::Primary) => parts.surname.push(w.text.clone()),
                        Piece::Word(w, _) => parts.alt_surname.push(w.text.clone()),
                        Piece::Comma => {}
                    }
                }
                for piece in &single[comma + 1..] {
                    match piece {
                        Piece::Word(w, Role::Primary) => parts.push_given(w),
                        Piece::Word(w, Role::Nee) => parts.alt_surname.push(w.text.clone()),
                        Piece::Word(w, _) => parts.alt_given.push(w.text.clone()),
                        Piece::Comma => parts.rubbish.push(",".into()),
                    }
                }
            }
            None => {
                let by_role = |role: Role| -> Vec<Word> {
                    single
                        .iter()
                        .filter_map(|p| match p {
                            Piece::Word(w, r) if *r == role => Some(w.clone()),
                            _ => None,
                        })
                        .collect()
                };
                let (given, surname) = split_given_surname(by_role(Role::Primary));
                for w in &given {
                    parts.push_given(w);
                }
                parts.surname.extend(surname.map(|w| w.text));
                for role in [Role::Alt, Role::Paren] {
                    let (given, surname) = split_given_surname(by_role(role));
                    parts.alt_given.extend(given.into_iter().map(|w| w.text));
                    parts.alt_surname.extend(surname.map(|w| w.text));
                }
                parts
                    .alt_surname
                    .extend(by_role(Role::Nee).into_iter().map(|w| w.text));
            }
        },
        _ => {}
    }
    parts
}

impl NameParts {
    fn push_given(&mut self, word: &Word) {
        self.given.push(word.text.clone());
        self.given_tags.push(word.tags.clone());
    }
}

/// Titles, prefixes, rubbish and punctuation out of one field's tokens.
fn classify(tokens: &[Token], parts: &mut NameParts) -> Vec<Item> {
    let mut items = Vec::with_capacity(tokens.len());
    let mut prefix = String::new();
    for token in tokens {
        if token.has_tag("PR") || token.has_tag("ST") {
            prefix.push_str(&token.canonical().replace(' ', ""));
            continue;
        }
        let item = if let Some(title) = token.entries.iter().find(|e| e.tag == "TI") {
            parts.titles.push(title.canonical.clone());
            None
        } else if token.has_tag("BO") {
            None
        } else if token.has_tag("NE") {
            Some(Item::Switch(Role::Nee))
        } else if token.has_tag("SP") {
            Some(Item::Switch(Role::Alt))
        } else if token.has_tag("HY") {
            Some(Item::Hyphen)
        } else if token.has_tag("CO") {
            Some(Item::Comma)
        } else if token.has_tag("OB") {
            Some(Item::Open)
        } else if token.has_tag("CB") {
            Some(Item::Close)
        } else if ["NU", "AN", "RU"].iter().any(|t| token.has_tag(t)) {
            parts.rubbish.push(token.original.clone());
            None
        } else {
            items.push(Item::Word(Word::from_token(token, &prefix)));
            prefix.clear();
            continue;
        };
        if !prefix.is_empty() {
            items.push(Item::Word(prefix_word(&prefix)));
            prefix.clear();
        }
        items.extend(item);
    }
    if !prefix.is_empty() {
        items.push(Item::Word(prefix_word(&prefix)));
    }
    items
}

fn prefix_word(prefix: &str) -> Word {
    Word {
        text: prefix.to_string(),
        tags: vec!["PR".into()],
    }
}

/// `word - word` becomes one word; any other hyphen is dropped.
fn join_hyphens(items: Vec<Item>) -> Vec<Item> {
    let mut out: Vec<Item> = Vec::with_capacity(items.len());
    let mut iter = items.into_iter().peekable();
    while let Some(item) = iter.next() {
        if item != Item::Hyphen {
            out.push(item);
            continue;
        }
        let next_is_word = matches!(iter.peek(), Some(Item::Word(_)));
        if let (Some(Item::Word(left)), true) = (out.last_mut(), next_is_word) {
            if let Some(Item::Word(right)) = iter.next() {
                left.text = format!("{}-{}", left.text, right.text);
                for tag in right.tags {
                    if !left.tags.contains(&tag) {
                        left.tags.push(tag);
                    }
                }
            }
        }
    }
    out
}

/// Attach a role to every word: alternatives after a switch word,
/// parenthesised words, or primary.
fn assign_roles(items: Vec<Item>) -> Vec<Piece> {
    let mut role = Role::Primary;
    let mut depth = 0usize;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Item::Word(w) => {
                let r = if depth > 0 { Role::Paren } else { role };
                out.push(Piece::Word(w, r));
            }
            Item::Switch(r) => role = r,
            Item::Open => depth += 1,
            Item::Close => depth = depth.saturating_sub(1),
            Item::Comma => {
                role = Role::Primary;
                out.push(Piece::Comma);
            }
            Item::Hyphen => {}
        }
    }
    out
}

/// One word: a given name when tagged only as one, otherwise a surname.
/// Several words: the last is the surname.
fn split_given_surname(mut words: Vec<Word>) -> (Vec<Word>, Option<Word>) {
    match words.len() {
        0 => (Vec::new(), None),
        1 if words[0].given_only() => (words, None),
        _ => {
            let surname = words.pop();
            (words, surname)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldList;
    use crate::resources::LookupTable;

    const TABLE: &str = "\
TI:mr:mister
TI:mrs:missus
TI:dr:doctor
GM:peter:pete
GM:john:jon
GF:mary
GF:maria
GM:maria
SN:smith
SN:jones
SN:peters
PR:van der
PR:de
SP:known as:aka
SP:or
NE:nee
BO:baby of
RU:deceased
";

    fn std(method: NameMethod, fields: &[&str]) -> NameStandardizer {
        let mut res = Resources::default();
        let mut table = LookupTable::new("name", "");
        table.parse_into("name.tbl", TABLE).unwrap();
        res.add_lookup_table("name", table);
        let config = NameStandardizerConfig {
            input_fields: FieldList(fields.iter().map(|s| s.to_string()).collect()),
            output_fields: NAME_SLOTS.iter().map(|s| s.to_string()).collect(),
            lookup_table: "name".into(),
            correction_list: None,
            hmm: None,
            male_titles: vec!["mr".into()],
            female_titles: vec!["mrs".into(), "ms".into()],
            field_separator: " ".into(),
            check_word_spill: false,
            rubbish_field: Some("rubbish".into()),
        };
        NameStandardizer::assemble(&config, method, &res).unwrap()
    }

    fn rules(values: &[&str]) -> StandardizedRecord {
        let fields: Vec<String> = (0..values.len()).map(|i| format!("f{i}")).collect();
        let names: Vec<&str> = fields.iter().map(String::as_str).collect();
        let mut out = StandardizedRecord::new(0);
        std(NameMethod::Rules, &names).standardize(values, &mut out);
        out
    }

    #[test]
    fn two_fields_given_and_surname() {
        let out = rules(&["Peter John", "Smith"]);
        assert_eq!(out.get("given_name"), Some("peter john"));
        assert_eq!(out.get("surname"), Some("smith"));
        assert_eq!(out.get("gender_guess"), Some("male"));
        assert_eq!(out.get("title"), None);
    }

    #[test]
    fn comma_puts_surname_first() {
        let out = rules(&["smith, mary"]);
        assert_eq!(out.get("surname"), Some("smith"));
        assert_eq!(out.get("given_name"), Some("mary"));
        assert_eq!(out.get("gender_guess"), Some("female"));
    }

    #[test]
    fn single_word_given_or_surname() {
        assert_eq!(rules(&["peter"]).get("given_name"), Some("peter"));
        assert_eq!(rules(&["peter"]).get("surname"), None);
        // Tagged as surname too.
        assert_eq!(rules(&["peters"]).get("surname"), Some("peters"));
        // Unknown word.
        assert_eq!(rules(&["zzyzx"]).get("surname"), Some("zzyzx"));
    }

    #[test]
    fn title_and_variants_are_canonical() {
        let out = rules(&["Mister Pete Smith"]);
        assert_eq!(out.get("title"), Some("mr"));
        assert_eq!(out.get("given_name"), Some("peter"));
        assert_eq!(out.get("surname"), Some("smith"));
        assert_eq!(out.get("gender_guess"), Some("male"));
    }

    #[test]
    fn title_overrides_given_name_gender() {
        let out = rules(&["mrs peter smith"]);
        assert_eq!(out.get("gender_guess"), Some("female"));
        // Unisex given name, no title.
        assert_eq!(rules(&["maria smith"]).get("gender_guess"), None);
    }

    #[test]
    fn hyphenated_and_prefixed_surnames() {
        let out = rules(&["mary", "smith-jones"]);
        assert_eq!(out.get("surname"), Some("smith-jones"));
        let out = rules(&["peter van der berg"]);
        assert_eq!(out.get("given_name"), Some("peter"));
        assert_eq!(out.get("surname"), Some("vanderberg"));
    }

    #[test]
    fn alternatives_and_maiden_names() {
        let out = rules(&["mary smith nee jones"]);
        assert_eq!(out.get("given_name"), Some("mary"));
        assert_eq!(out.get("surname"), Some("smith"));
        assert_eq!(out.get("alt_surname"), Some("jones"));

        let out = rules(&["peter aka john smith"]);
        assert_eq!(out.get("given_name"), Some("peter"));
        assert_eq!(out.get("surname"), None);
        assert_eq!(out.get("alt_given_name"), Some("john"));
        assert_eq!(out.get("alt_surname"), Some("smith"));

        let out = rules(&["peter or john", "smith"]);
        assert_eq!(out.get("given_name"), Some("peter"));
        assert_eq!(out.get("alt_given_name"), Some("john"));
    }

    #[test]
    fn parentheses_hold_alternatives() {
        let out = rules(&["peter (jon)", "smith (jones)"]);
        assert_eq!(out.get("given_name"), Some("peter"));
        assert_eq!(out.get("alt_given_name"), Some("john"));
        assert_eq!(out.get("surname"), Some("smith"));
        assert_eq!(out.get("alt_surname"), Some("jones"));
    }

    #[test]
    fn rubbish_is_collected() {
        let out = rules(&["baby of mary 2nd smith, deceased, 42"]);
        // Left of the first comma is the surname part.
        assert_eq!(out.get("surname"), Some("mary smith"));
        assert_eq!(out.get("given_name"), None);
        let rubbish = out.get("rubbish").unwrap_or_default();
        assert!(rubbish.contains("2nd"), "{rubbish}");
        assert!(rubbish.contains("deceased"), "{rubbish}");
        assert!(rubbish.contains("42"), "{rubbish}");
        assert!(rubbish.contains(','), "{rubbish}");
    }

    #[test]
    fn malformed_input_never_fails() {
        for input in ["", ",,,", "( ( )", "- - -", "and or nee", "))))((("] {
            let out = rules(&[input]);
            assert_eq!(out.get("given_name"), None, "{input}");
            assert_eq!(out.get("gender_guess"), None, "{input}");
        }
        assert!(rules(&["", ""]).is_empty());
    }

    #[test]
    fn extra_fields_are_rubbish() {
        let out = rules(&["peter", "smith", "jones"]);
        assert_eq!(out.get("surname"), Some("smith"));
        assert_eq!(out.get("rubbish"), Some("jones"));
    }

    // -----------------------------------------------------------------------
    // HMM
    // -----------------------------------------------------------------------

    const HMM: &str = r#"{
        "name": "name",
        "states": ["titl", "gname1", "gname2", "ghyph", "sname1", "sname2", "shyph", "knwn", "agname1", "rubb"],
        "observations": ["TI", "GM", "GF", "SN", "UN", "HY", "SP", "II", "NU"],
        "start": { "titl": 0.2, "gname1": 0.7, "sname1": 0.1 },
        "transitions": {
            "titl":    { "gname1": 0.9, "sname1": 0.1 },
            "gname1":  { "gname2": 0.2, "sname1": 0.6, "ghyph": 0.05, "knwn": 0.15 },
            "gname2":  { "sname1": 1.0 },
            "ghyph":   { "gname2": 1.0 },
            "sname1":  { "shyph": 0.2, "sname2": 0.1, "rubb": 0.1, "knwn": 0.6 },
            "shyph":   { "sname2": 1.0 },
            "knwn":    { "agname1": 1.0 },
            "agname1": { "sname1": 1.0 },
            "rubb":    { "rubb": 1.0 }
        },
        "emissions": {
            "titl":    { "TI": 1.0 },
            "gname1":  { "GM": 0.4, "GF": 0.4, "UN": 0.1, "II": 0.1 },
            "gname2":  { "GM": 0.4, "GF": 0.4, "UN": 0.1, "II": 0.1 },
            "ghyph":   { "HY": 1.0 },
            "sname1":  { "SN": 0.7, "UN": 0.3 },
            "sname2":  { "SN": 0.7, "UN": 0.3 },
            "shyph":   { "HY": 1.0 },
            "knwn":    { "SP": 1.0 },
            "agname1": { "GM": 0.5, "GF": 0.5 },
            "rubb":    { "NU": 1.0 }
        }
    }"#;

    fn hmm(values: &[&str]) -> StandardizedRecord {
        let model = HmmModel::from_json("name.json", HMM).unwrap();
        let mut out = StandardizedRecord::new(0);
        std(NameMethod::Hmm(Arc::new(model)), &["name"]).standardize(values, &mut out);
        out
    }

    #[test]
    fn hmm_segments_a_full_name() {
        let out = hmm(&["dr peter smith"]);
        assert_eq!(out.get("title"), Some("dr"));
        assert_eq!(out.get("given_name"), Some("peter"));
        assert_eq!(out.get("surname"), Some("smith"));
        assert_eq!(out.get("gender_guess"), Some("male"));
    }

    #[test]
    fn hmm_hyphenated_surname_is_glued() {
        let out = hmm(&["mary smith-jones"]);
        assert_eq!(out.get("given_name"), Some("mary"));
        assert_eq!(out.get("surname"), Some("smith-jones"));
        assert_eq!(out.get("gender_guess"), Some("female"));
    }

    #[test]
    fn hmm_alternative_given_name() {
        let out = hmm(&["peter smith aka john"]);
        assert_eq!(out.get("given_name"), Some("peter"));
        assert_eq!(out.get("surname"), Some("smith"));
        assert_eq!(out.get("alt_given_name"), Some("john"));
    }

    #[test]
    fn hmm_is_deterministic_and_handles_empty_input() {
        assert_eq!(hmm(&["peter smith"]), hmm(&["peter smith"]));
        assert!(hmm(&[""]).is_empty());
    }
}
