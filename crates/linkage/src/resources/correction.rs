use std::path::Path;

use crate::error::LinkageError;

/// Ordered substring replacements applied to cleaned text before tagging.
///
/// One rule per line, `original => replacement`. Either side may be wrapped in
/// double quotes to keep leading/trailing spaces, e.g. `" and/or " => " andor "`.
#[derive(Debug, Clone, Default)]
pub struct CorrectionList {
    name: String,
    rules: Vec<(String, String)>,
}

impl CorrectionList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    pub fn load(name: impl Into<String>, path: &Path) -> Result<Self, LinkageError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LinkageError::resource(path.display().to_string(), e))?;
        Self::parse(name, &path.display().to_string(), &content)
    }

    pub fn parse(name: impl Into<String>, source: &str, content: &str) -> Result<Self, LinkageError> {
        let mut list = Self::new(name);
        for (lineno, raw) in content.lines().enumerate() {
            if raw.trim().is_empty() || raw.trim_start().starts_with('#') {
                continue;
            }
            let (orig, repl) = raw.split_once("=>").ok_or_else(|| {
                LinkageError::resource(source, format!("line {}: expected 'original => replacement'", lineno + 1))
            })?;
            let orig = unquote(orig);
            if orig.is_empty() {
                return Err(LinkageError::resource(
                    source,
                    format!("line {}: empty original", lineno + 1),
                ));
            }
            list.push(orig, unquote(repl));
        }
        Ok(list)
    }

    pub fn push(&mut self, original: impl Into<String>, replacement: impl Into<String>) {
        self.rules.push((original.into(), replacement.into()));
    }

    /// Apply every rule in order.
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (orig, repl) in &self.rules {
            if out.contains(orig.as_str()) {
                out = out.replace(orig.as_str(), repl);
            }
        }
        out
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn unquote(s: &str) -> String {
    let t = s.trim();
    if t.len() >= 2 && t.starts_with('"') && t.ends_with('"') {
        t[1..t.len() - 1].to_string()
    } else {
        t.to_string()
    }
}
