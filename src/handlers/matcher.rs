//! MIME applicability predicates for handlers

use mime::Mime;

/// One accepted MIME pattern: either `type/*` or an exact `type/subtype`
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    AnySubtype(String),
    Exact(String),
}

/// Set of MIME patterns a handler accepts
///
/// Matching uses the essence only (`image/png; q=1` matches `image/png`)
/// and is case insensitive. Unparseable MIME strings never match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeSet {
    patterns: Vec<Pattern>,
}

impl MimeSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|p| {
                let p = p.as_ref().trim().to_lowercase();
                match p.strip_suffix("/*") {
                    Some("") => None,
                    Some(top) => Some(Pattern::AnySubtype(top.to_string())),
                    None if p.is_empty() => None,
                    None => Some(Pattern::Exact(p.clone())),
                }
            })
            .collect();

        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, mime: &str) -> bool {
        let Ok(parsed) = mime.trim().parse::<Mime>() else {
            return false;
        };

        let top = parsed.type_().as_str().to_lowercase();
        let essence = parsed.essence_str().to_lowercase();

        self.patterns.iter().any(|pattern| match pattern {
            Pattern::AnySubtype(t) => *t == top,
            Pattern::Exact(e) => *e == essence,
        })
    }
}
