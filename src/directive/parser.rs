//! Directive scanner
//!
//! Extracts `[TOOL_CALL:<name>:<parameters>]` directives from model text
//! in one left-to-right pass.
//!
//! ```text
//! directive  := "[TOOL_CALL:" name ":" parameters "]"
//! name       := one or more chars except ':'
//! parameters := one or more chars except ']'
//! ```
//!
//! A candidate that does not complete the grammar is not an error: the
//! scan resumes one byte after its `[` and the text is left alone.

/// Literal that opens every directive
pub const DIRECTIVE_PREFIX: &str = "[TOOL_CALL:";

/// One tool call found in model text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Tool name, surrounding whitespace trimmed
    pub tool_name: String,

    /// Parameter string, surrounding whitespace trimmed, otherwise uninterpreted
    pub raw_parameters: String,

    /// Exact matched substring, untrimmed
    pub source_span: String,

    /// Byte offset of `source_span` in the parsed text
    pub offset: usize,
}

impl Directive {
    /// Byte offset one past the closing `]`
    pub fn end(&self) -> usize {
        self.offset + self.source_span.len()
    }
}

/// Find every non-overlapping directive, in order of appearance
pub fn parse_directives(text: &str) -> Vec<Directive> {
    let mut directives = Vec::new();
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find(DIRECTIVE_PREFIX) {
        let start = cursor + found;
        match match_at(text, start) {
            Some(directive) => {
                cursor = directive.end();
                directives.push(directive);
            }
            // '[' is a single byte, so start + 1 is a char boundary
            None => cursor = start + 1,
        }
    }

    directives
}

/// Try to complete the grammar from a prefix found at `start`
fn match_at(text: &str, start: usize) -> Option<Directive> {
    let name_start = start + DIRECTIVE_PREFIX.len();
    let name_len = text[name_start..].find(':')?;
    if name_len == 0 {
        return None;
    }

    let params_start = name_start + name_len + 1;
    let params_len = text[params_start..].find(']')?;
    if params_len == 0 {
        return None;
    }

    let end = params_start + params_len + 1;
    Some(Directive {
        tool_name: text[name_start..name_start + name_len].trim().to_string(),
        raw_parameters: text[params_start..params_start + params_len].trim().to_string(),
        source_span: text[start..end].to_string(),
        offset: start,
    })
}

/// Remove every directive span from `text`, keeping everything else
///
/// Directives must come from parsing this same text; entries whose span
/// does not sit at its recorded offset are skipped. Removing a span can join
/// its neighbours into a new directive (`[TOOL_[TOOL_CALL:a:b]CALL:c:d]`), so
/// the text is stripped again until nothing parses: the result never
/// contains a directive.
pub fn strip_directives(text: &str, directives: &[Directive]) -> String {
    let mut cleaned = remove_spans(text, directives);
    loop {
        let joined = parse_directives(&cleaned);
        if joined.is_empty() {
            return cleaned;
        }
        cleaned = remove_spans(&cleaned, &joined);
    }
}

fn remove_spans(text: &str, directives: &[Directive]) -> String {
    let mut ordered: Vec<&Directive> = directives.iter().collect();
    ordered.sort_by_key(|d| d.offset);

    let mut cleaned = String::with_capacity(text.len());
    let mut cursor = 0;
    for directive in ordered {
        if directive.offset < cursor
            || text.get(directive.offset..directive.end()) != Some(directive.source_span.as_str())
        {
            continue;
        }
        cleaned.push_str(&text[cursor..directive.offset]);
        cursor = directive.end();
    }
    cleaned.push_str(&text[cursor..]);
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_single_directive() {
        let text = "Let me check. [TOOL_CALL:calculator:2+2]";
        let directives = parse_directives(text);

        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].tool_name, "calculator");
        assert_eq!(directives[0].raw_parameters, "2+2");
        assert_eq!(directives[0].source_span, "[TOOL_CALL:calculator:2+2]");
        assert_eq!(directives[0].offset, 14);
    }

    #[test]
    fn test_multiple_directives_in_order() {
        let text = "[TOOL_CALL:search:rust] and [TOOL_CALL:memory:action=add,content=x] done";
        let directives = parse_directives(text);

        assert_eq!(directives.len(), 2);
        assert_eq!(directives[0].tool_name, "search");
        assert_eq!(directives[1].tool_name, "memory");
        assert_eq!(directives[1].raw_parameters, "action=add,content=x");
    }

    #[test]
    fn test_no_directives() {
        assert!(parse_directives("The answer is 4.").is_empty());
        assert!(parse_directives("").is_empty());
    }

    #[test]
    fn test_incomplete_candidates_are_ignored() {
        // no closing bracket
        assert!(parse_directives("[TOOL_CALL:search:rust").is_empty());
        // no name
        assert!(parse_directives("[TOOL_CALL::rust]").is_empty());
        // no parameters
        assert!(parse_directives("[TOOL_CALL:search:]").is_empty());
        // no separator after the name
        assert!(parse_directives("[TOOL_CALL:search]").is_empty());
    }

    #[test]
    fn test_failed_candidate_resumes_scan() {
        let text = "[TOOL_CALL:search:] [TOOL_CALL:calculator:1+1]";
        let directives = parse_directives(text);

        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].tool_name, "calculator");
        assert_eq!(directives[0].offset, 20);
    }

    #[test]
    fn test_name_runs_to_first_colon() {
        let text = "[TOOL_CALL:oops] then [TOOL_CALL:calculator:1+1]";
        let directives = parse_directives(text);

        // The first candidate swallows up to the next ':' as its name
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].tool_name, "oops] then [TOOL_CALL");
        assert_eq!(directives[0].raw_parameters, "calculator:1+1");
    }

    #[test]
    fn test_parameters_may_contain_colons() {
        let directives = parse_directives("[TOOL_CALL:search:time: now]");
        assert_eq!(directives[0].raw_parameters, "time: now");
    }

    #[test]
    fn test_span_keeps_whitespace() {
        let text = "x [TOOL_CALL: search :  python编程  ] y";
        let directives = parse_directives(text);

        assert_eq!(directives[0].tool_name, "search");
        assert_eq!(directives[0].raw_parameters, "python编程");
        assert_eq!(directives[0].source_span, "[TOOL_CALL: search :  python编程  ]");
        assert_eq!(strip_directives(text, &directives), "x  y");
    }

    #[test]
    fn test_strip_keeps_reasoning() {
        let text = "Let me check. [TOOL_CALL:calculator:2+2] Then search [TOOL_CALL:search:q]!";
        let directives = parse_directives(text);
        assert_eq!(strip_directives(text, &directives), "Let me check.  Then search !");
    }

    #[test]
    fn test_strip_skips_foreign_directives() {
        let foreign = parse_directives("[TOOL_CALL:a:b]");
        assert_eq!(strip_directives("plain text here", &foreign), "plain text here");
    }

    #[test]
    fn test_strip_removes_joined_directives() {
        let text = "[TOOL_[TOOL_CALL:calculator:1+1]CALL:search:rust] done";
        let directives = parse_directives(text);
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].tool_name, "calculator");

        let cleaned = strip_directives(text, &directives);
        assert_eq!(cleaned, " done");
        assert!(parse_directives(&cleaned).is_empty());
    }

    #[derive(Debug, Clone)]
    struct Piece {
        filler: &'static str,
        call: Option<(&'static str, &'static str)>,
    }

    #[derive(Debug, Clone)]
    struct Doc(Vec<Piece>);

    const FILLERS: [&str; 9] = [
        "Let me check. ",
        "ok ",
        "结果: ",
        "a:b ",
        "] ",
        "[note] ",
        "",
        "TOOL_CALL ",
        "[TOOL_",
    ];
    const NAMES: [&str; 4] = ["calculator", "search", "memory", "my tool"];
    const PARAMS: [&str; 6] = [
        "2+2",
        "query=rust",
        "action=add,content=x y",
        "python编程",
        "a:b:c",
        " spaced ",
    ];

    impl Arbitrary for Doc {
        fn arbitrary(g: &mut Gen) -> Self {
            let len = usize::arbitrary(g) % 8;
            let pieces = (0..len)
                .map(|_| Piece {
                    filler: g.choose(&FILLERS).copied().unwrap_or(""),
                    call: if bool::arbitrary(g) {
                        Some((
                            g.choose(&NAMES).copied().unwrap_or("calculator"),
                            g.choose(&PARAMS).copied().unwrap_or("1"),
                        ))
                    } else {
                        None
                    },
                })
                .collect();
            Doc(pieces)
        }
    }

    impl Doc {
        fn render(&self) -> String {
            self.0
                .iter()
                .map(|p| match p.call {
                    Some((name, params)) => format!("{}[TOOL_CALL:{}:{}]", p.filler, name, params),
                    None => p.filler.to_string(),
                })
                .collect()
        }

        fn calls(&self) -> Vec<(&'static str, &'static str)> {
            self.0.iter().filter_map(|p| p.call).collect()
        }
    }

    #[quickcheck]
    fn prop_finds_every_directive_in_order(doc: Doc) -> bool {
        let text = doc.render();
        let directives = parse_directives(&text);
        let expected = doc.calls();

        directives.len() == expected.len()
            && directives.iter().zip(expected).all(|(d, (name, params))| {
                d.tool_name == name
                    && d.raw_parameters == params.trim()
                    && d.source_span == format!("[TOOL_CALL:{}:{}]", name, params)
                    && &text[d.offset..d.end()] == d.source_span
            })
    }

    #[quickcheck]
    fn prop_stripping_is_idempotent(doc: Doc) -> bool {
        let text = doc.render();
        let cleaned = strip_directives(&text, &parse_directives(&text));
        parse_directives(&cleaned).is_empty()
    }

    /// Free-form fragments that can join into new directives once stripped
    #[derive(Debug, Clone)]
    struct Fragments(String);

    const FRAGMENTS: [&str; 7] = [
        "[TOOL_",
        "CALL:",
        "[TOOL_CALL:calculator:1+1]",
        "search",
        ":rust",
        "]",
        " ",
    ];

    impl Arbitrary for Fragments {
        fn arbitrary(g: &mut Gen) -> Self {
            let len = usize::arbitrary(g) % 12;
            Fragments(
                (0..len)
                    .map(|_| g.choose(&FRAGMENTS).copied().unwrap_or(""))
                    .collect(),
            )
        }
    }

    #[quickcheck]
    fn prop_stripped_fragments_hold_no_directive(fragments: Fragments) -> bool {
        let text = fragments.0;
        let cleaned = strip_directives(&text, &parse_directives(&text));
        parse_directives(&cleaned).is_empty() && cleaned.len() <= text.len()
    }
}
