use tracing::debug;

use crate::query::ast::{MatchKind, Query, TermQuery};

/// Boolean connector carried by a token. The implicit connector
/// between plain whitespace-separated tokens is And.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connector {
    And,
    Or,
    Not,
}

#[derive(Debug)]
struct RawToken {
    connector: Connector,
    field: Option<String>,
    pattern: String,
    kind: MatchKind,
}

/// Explicit match-kind codes accepted by the structured search form:
/// `a` = all words, `o` = any word, `e` = exact phrase, `p` = partial
/// phrase, `r` = regular expression.
pub fn match_kind_code(code: &str) -> Option<MatchKind> {
    match code {
        "e" => Some(MatchKind::ExactPhrase),
        "p" => Some(MatchKind::PartialPhrase),
        "r" => Some(MatchKind::Regex),
        "a" | "o" | "w" => Some(MatchKind::Word),
        _ => None,
    }
}

/// Total query parser: every input string maps to a well-formed tree.
/// Unrecognized syntax degrades to the most specific interpretable
/// leaf, never to a parse error.
pub struct QueryParser {
    pub default_field: String,
}

impl QueryParser {
    pub fn new(default_field: &str) -> Self {
        QueryParser {
            default_field: default_field.to_string(),
        }
    }

    /// Parse a free-text query. `field_hint` scopes tokens that carry
    /// no `field:` prefix of their own (the `f` request parameter);
    /// when empty, the parser's default field applies.
    pub fn parse(&self, input: &str, field_hint: &str) -> Query {
        let hint = if field_hint.is_empty() {
            self.default_field.as_str()
        } else {
            field_hint
        };
        let tokens = tokenize(input);
        debug!(input, tokens = tokens.len(), "parsed query tokens");
        if tokens.is_empty() {
            return Query::term(hint, "", MatchKind::Word);
        }

        // Or binds loosest: split the token run into Or-groups, fold
        // And/AndNot left-to-right inside each group.
        let mut groups: Vec<Vec<&RawToken>> = vec![Vec::new()];
        for token in &tokens {
            if token.connector == Connector::Or && !groups.last().unwrap().is_empty() {
                groups.push(Vec::new());
            }
            groups.last_mut().unwrap().push(token);
        }

        let mut query: Option<Query> = None;
        for group in groups {
            let mut acc: Option<Query> = None;
            for token in group {
                let leaf = self.leaf(token, hint);
                acc = Some(match (acc, token.connector) {
                    // A leading Not has nothing to subtract from;
                    // degrade it to a plain term.
                    (None, _) => leaf,
                    (Some(a), Connector::Not) => a.and_not(leaf),
                    (Some(a), _) => a.and(leaf),
                });
            }
            if let Some(g) = acc {
                query = Some(match query {
                    None => g,
                    Some(q) => q.or(g),
                });
            }
        }
        query.unwrap_or_else(|| Query::term(hint, "", MatchKind::Word))
    }

    /// Parse one structured-search part: an explicit match kind wins
    /// over quoting, `a`/`o` split the pattern into word leaves joined
    /// with And/Or, and an absent kind falls back to free-text parsing.
    pub fn parse_part(&self, pattern: &str, field: &str, kind_code: &str) -> Query {
        let field = if field.is_empty() {
            self.default_field.as_str()
        } else {
            field
        };
        match match_kind_code(kind_code) {
            Some(MatchKind::Word) => {
                let words: Vec<&str> = pattern.split_whitespace().collect();
                if words.is_empty() {
                    return Query::term(field, "", MatchKind::Word);
                }
                let any = kind_code == "o";
                let mut acc = Query::term(field, words[0], MatchKind::Word);
                for word in &words[1..] {
                    let leaf = Query::term(field, word, MatchKind::Word);
                    acc = if any { acc.or(leaf) } else { acc.and(leaf) };
                }
                acc
            }
            Some(kind) => Query::term(field, pattern.trim_matches(quote_for(kind)), kind),
            None => self.parse(pattern, field),
        }
    }

    fn leaf(&self, token: &RawToken, hint: &str) -> Query {
        let field = token.field.as_deref().unwrap_or(hint);
        Query::term(field, &token.pattern, token.kind)
    }
}

fn quote_for(kind: MatchKind) -> char {
    match kind {
        MatchKind::ExactPhrase => '"',
        MatchKind::PartialPhrase => '\'',
        MatchKind::Regex => '/',
        MatchKind::Word => ' ',
    }
}

/// Split a raw query string into operator-tagged tokens. Quoted and
/// slash-delimited spans may contain whitespace; an unterminated span
/// runs to the end of the input rather than failing.
fn tokenize(input: &str) -> Vec<RawToken> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        let connector = match chars[i] {
            '+' => {
                i += 1;
                Connector::And
            }
            '-' => {
                i += 1;
                Connector::Not
            }
            '|' => {
                i += 1;
                Connector::Or
            }
            _ => Connector::And,
        };
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        // Optional field prefix: unquoted chars up to ':', with the
        // colon appearing before any whitespace or delimiter.
        let mut field = None;
        let mut j = i;
        while j < chars.len()
            && !chars[j].is_whitespace()
            && !matches!(chars[j], '"' | '\'' | '/' | ':')
        {
            j += 1;
        }
        if j < chars.len() && chars[j] == ':' && j > i {
            field = Some(chars[i..j].iter().collect::<String>());
            i = j + 1;
        }

        let (pattern, kind) = match chars.get(i) {
            Some('"') => read_span(&chars, &mut i, '"', MatchKind::ExactPhrase),
            Some('\'') => read_span(&chars, &mut i, '\'', MatchKind::PartialPhrase),
            Some('/') => read_span(&chars, &mut i, '/', MatchKind::Regex),
            _ => {
                let start = i;
                while i < chars.len() && !chars[i].is_whitespace() {
                    i += 1;
                }
                (chars[start..i].iter().collect::<String>(), MatchKind::Word)
            }
        };

        if pattern.is_empty() && field.is_none() {
            continue;
        }
        tokens.push(RawToken {
            connector,
            field,
            pattern,
            kind,
        });
    }
    tokens
}

fn read_span(chars: &[char], i: &mut usize, delim: char, kind: MatchKind) -> (String, MatchKind) {
    *i += 1; // opening delimiter
    let start = *i;
    while *i < chars.len() && chars[*i] != delim {
        *i += 1;
    }
    let pattern: String = chars[start..*i].iter().collect();
    if *i < chars.len() {
        *i += 1; // closing delimiter
    }
    (pattern, kind)
}
