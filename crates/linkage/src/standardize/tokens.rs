//! Cleaning, word-spill repair and lookup-table tagging of free text.

use std::sync::Arc;

use crate::resources::{CorrectionList, LookupTable, TagEntry};

/// Fallback tag rules differ slightly between names and addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagScheme {
    Name,
    Address,
}

/// Field-boundary token placed between input fields.
pub const FIELD_BOUNDARY: &str = "|";

/// A word or phrase with every (tag, canonical form) it can stand for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub original: String,
    /// Never empty.
    pub entries: Vec<TagEntry>,
}

impl Token {
    fn single(original: &str, tag: &str) -> Self {
        Self {
            original: original.to_string(),
            entries: vec![TagEntry {
                tag: tag.to_string(),
                canonical: original.to_string(),
            }],
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.tag.as_str())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().any(|t| t == tag)
    }

    /// Canonical form of the first entry.
    pub fn canonical(&self) -> &str {
        self.entries
            .first()
            .map_or(self.original.as_str(), |e| e.canonical.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct TokenPipeline {
    lookup: Arc<LookupTable>,
    corrections: Option<Arc<CorrectionList>>,
    scheme: TagScheme,
    check_word_spill: bool,
}

impl TokenPipeline {
    pub fn new(
        lookup: Arc<LookupTable>,
        corrections: Option<Arc<CorrectionList>>,
        scheme: TagScheme,
        check_word_spill: bool,
    ) -> Self {
        Self {
            lookup,
            corrections,
            scheme,
            check_word_spill,
        }
    }

    /// Lower-case, strip quotes, apply corrections and split punctuation
    /// into separate words.
    pub fn clean(&self, text: &str) -> Vec<String> {
        let mut s: String = text
            .to_lowercase()
            .chars()
            .filter(|c| *c != '\'' && *c != '"')
            .map(|c| if c == '.' { ' ' } else { c })
            .collect();
        s = collapse(&s);

        if let Some(list) = &self.corrections {
            s = list.apply(&format!(" {s} "));
        }

        let mut spaced = String::with_capacity(s.len() + 8);
        for c in s.chars() {
            if matches!(c, '-' | ',' | '/' | '(' | ')') {
                spaced.push(' ');
                spaced.push(c);
                spaced.push(' ');
            } else {
                spaced.push(c);
            }
        }
        spaced.split_whitespace().map(str::to_string).collect()
    }

    /// Clean every input field. Adjacent fields get their spilled words
    /// repaired when `check_word_spill` is on.
    pub fn words(&self, fields: &[&str]) -> Vec<Vec<String>> {
        let mut words: Vec<Vec<String>> = fields.iter().map(|f| self.clean(f)).collect();
        if self.check_word_spill {
            for i in 1..words.len() {
                let (head, tail) = words.split_at_mut(i);
                let (Some(left), Some(right)) = (head[i - 1].last_mut(), tail[0].first()) else {
                    continue;
                };
                let joined = format!("{left}{right}");
                if self.lookup.contains(&joined)
                    && !self.lookup.contains(left)
                    && !self.lookup.contains(right)
                {
                    *left = joined;
                    tail[0].remove(0);
                }
            }
        }
        words
    }

    /// Greedy longest-match tagging of one field's words.
    pub fn tag(&self, words: &[String]) -> Vec<Token> {
        let max_words = self.lookup.max_words().max(1);
        let mut tokens = Vec::with_capacity(words.len());
        let mut i = 0;
        while i < words.len() {
            let longest = max_words.min(words.len() - i);
            let hit = (1..=longest).rev().find_map(|len| {
                let phrase = words[i..i + len].join(" ");
                self.lookup.get(&phrase).map(|entries| {
                    (
                        len,
                        Token {
                            original: phrase,
                            entries: entries.to_vec(),
                        },
                    )
                })
            });
            match hit {
                Some((len, token)) if !token.entries.is_empty() => {
                    tokens.push(token);
                    i += len;
                }
                _ => {
                    tokens.push(Token::single(&words[i], self.fallback_tag(&words[i])));
                    i += 1;
                }
            }
        }
        tokens
    }

    /// Tag every field separately.
    pub fn tag_fields(&self, fields: &[&str]) -> Vec<Vec<Token>> {
        self.words(fields).iter().map(|w| self.tag(w)).collect()
    }

    /// Join non-empty fields with a field-boundary token.
    pub fn flatten(fields: Vec<Vec<Token>>) -> Vec<Token> {
        let mut out: Vec<Token> = Vec::new();
        for field in fields.into_iter().filter(|f| !f.is_empty()) {
            if !out.is_empty() {
                out.push(Token::single(FIELD_BOUNDARY, "VB"));
            }
            out.extend(field);
        }
        out
    }

    fn fallback_tag(&self, word: &str) -> &str {
        match word {
            "-" => return "HY",
            "," => return "CO",
            "/" => return "SL",
            FIELD_BOUNDARY => return "VB",
            "(" => return "OB",
            ")" => return "CB",
            _ => {}
        }
        let digits = word.chars().filter(char::is_ascii_digit).count();
        let n = word.chars().count();
        if digits == n {
            if self.scheme == TagScheme::Address && n == 4 {
                "N4"
            } else {
                "NU"
            }
        } else if digits > 0 {
            "AN"
        } else if self.scheme == TagScheme::Name && n == 1 {
            "II"
        } else {
            self.lookup.default_tag()
        }
    }
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Arc<LookupTable> {
        let mut t = LookupTable::new("t", "");
        t.parse_into(
            "t.tbl",
            "TI:doctor:dr\nGM:peter\nSN:peter\nSN:smith\nPR:van der\nSP:known as\nSN:macdonald\nWN:main\nWT:street:st\n",
        )
        .unwrap();
        Arc::new(t)
    }

    fn pipeline(scheme: TagScheme, spill: bool) -> TokenPipeline {
        let mut corr = CorrectionList::new("c");
        corr.push(" aka ", " known as ");
        TokenPipeline::new(table(), Some(Arc::new(corr)), scheme, spill)
    }

    fn tags(tokens: &[Token]) -> Vec<String> {
        tokens.iter().map(|t| t.tags().collect::<Vec<_>>().join("/")).collect()
    }

    #[test]
    fn clean_splits_punctuation_and_applies_corrections() {
        let p = pipeline(TagScheme::Name, false);
        assert_eq!(
            p.clean("Dr. Peter O'Brien-Smith aka \"Pete\" (Jr), 3rd"),
            vec!["dr", "peter", "obrien", "-", "smith", "known", "as", "pete", "(", "jr", ")", ",", "3rd"]
        );
    }

    #[test]
    fn longest_match_wins() {
        let p = pipeline(TagScheme::Name, false);
        let words: Vec<String> = ["van", "der", "berg"].iter().map(|s| s.to_string()).collect();
        let tokens = p.tag(&words);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].original, "van der");
        assert_eq!(tags(&tokens), vec!["PR", "UN"]);
    }

    #[test]
    fn every_entry_is_kept() {
        let p = pipeline(TagScheme::Name, false);
        let tokens = p.tag(&["peter".to_string(), "dr".to_string()]);
        assert_eq!(tags(&tokens), vec!["GM/SN", "TI"]);
        assert_eq!(tokens[1].canonical(), "doctor");
    }

    #[test]
    fn fallback_tags_by_scheme() {
        let name = pipeline(TagScheme::Name, false);
        let addr = pipeline(TagScheme::Address, false);
        let words: Vec<String> = ["42", "2600", "12a", "j", "-", ",", "/", "(", ")", "zzz"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            tags(&name.tag(&words)),
            vec!["NU", "NU", "AN", "II", "HY", "CO", "SL", "OB", "CB", "UN"]
        );
        assert_eq!(
            tags(&addr.tag(&words)),
            vec!["NU", "N4", "AN", "UN", "HY", "CO", "SL", "OB", "CB", "UN"]
        );
    }

    #[test]
    fn word_spill_is_repaired() {
        let p = pipeline(TagScheme::Name, true);
        let words = p.words(&["peter mac", "donald"]);
        assert_eq!(words, vec![vec!["peter", "macdonald"], vec![]]);

        // No repair when either half is a known word.
        let words = p.words(&["smith", "peter"]);
        assert_eq!(words, vec![vec!["smith"], vec!["peter"]]);
    }

    #[test]
    fn flatten_inserts_boundaries_between_non_empty_fields() {
        let p = pipeline(TagScheme::Address, false);
        let fields = p.tag_fields(&["12 main st", "", "canberra"]);
        let flat = TokenPipeline::flatten(fields);
        assert_eq!(tags(&flat), vec!["NU", "WN", "WT", "VB", "UN"]);
        assert_eq!(flat[2].canonical(), "street");
    }
}
