//! RTF to plain text by control-word stripping.
//!
//! This is not a full RTF reader. It tracks group nesting so that
//! non-content destinations (font/colour tables, stylesheets, document info,
//! `\*` extensions, embedded pictures) are skipped, maps paragraph and line
//! controls to newlines, and decodes `\'hh` and `\uN` escapes.

/// Destinations whose whole group carries no body text.
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "header",
    "footer",
    "headerl",
    "headerr",
    "footerl",
    "footerr",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "generator",
    "xmlnstbl",
    "themedata",
    "colorschememapping",
    "latentstyles",
    "datastore",
    "object",
];

#[derive(Debug, Clone, Copy)]
struct GroupState {
    skip: bool,
    /// Characters to drop after a `\uN` escape (`\ucN`).
    uc_skip: usize,
}

pub fn rtf_to_text(rtf: &str) -> String {
    let chars: Vec<char> = rtf.chars().collect();
    let mut out = String::new();
    let mut stack: Vec<GroupState> = Vec::new();
    let mut state = GroupState {
        skip: false,
        uc_skip: 1,
    };
    // Fallback characters still to swallow after a unicode escape.
    let mut pending_fallback = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '{' => {
                stack.push(state);
                pending_fallback = 0;
                i += 1;
            }
            '}' => {
                state = stack.pop().unwrap_or(state);
                pending_fallback = 0;
                i += 1;
            }
            '\\' => {
                i += 1;
                let Some(&next) = chars.get(i) else { break };
                if next.is_ascii_alphabetic() {
                    let start = i;
                    while i < chars.len() && chars[i].is_ascii_alphabetic() {
                        i += 1;
                    }
                    let word: String = chars[start..i].iter().collect();

                    let num_start = i;
                    if i < chars.len() && chars[i] == '-' {
                        i += 1;
                    }
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    let param: Option<i64> = if i > num_start {
                        chars[num_start..i].iter().collect::<String>().parse().ok()
                    } else {
                        None
                    };
                    // A single space delimiter belongs to the control word.
                    if i < chars.len() && chars[i] == ' ' {
                        i += 1;
                    }

                    if SKIPPED_DESTINATIONS.contains(&word.as_str()) {
                        state.skip = true;
                        continue;
                    }
                    if state.skip {
                        continue;
                    }
                    match word.as_str() {
                        "par" | "line" | "sect" | "page" | "row" => out.push('\n'),
                        "tab" | "cell" => out.push('\t'),
                        "emdash" => out.push('\u{2014}'),
                        "endash" => out.push('\u{2013}'),
                        "bullet" => out.push('\u{2022}'),
                        "lquote" => out.push('\u{2018}'),
                        "rquote" => out.push('\u{2019}'),
                        "ldblquote" => out.push('\u{201C}'),
                        "rdblquote" => out.push('\u{201D}'),
                        "uc" => state.uc_skip = param.unwrap_or(1).max(0) as usize,
                        "u" => {
                            if let Some(n) = param {
                                // Values above 32767 are written as negative i16.
                                let code = if n < 0 { n + 65536 } else { n };
                                if let Some(ch) = char::from_u32(code as u32) {
                                    out.push(ch);
                                }
                                pending_fallback = state.uc_skip;
                            }
                        }
                        _ => {}
                    }
                } else {
                    i += 1;
                    match next {
                        '*' => state.skip = true,
                        '\'' => {
                            let hex: String = chars.iter().skip(i).take(2).collect();
                            i += hex.chars().count();
                            if pending_fallback > 0 {
                                pending_fallback -= 1;
                            } else if !state.skip {
                                if let Ok(b) = u8::from_str_radix(&hex, 16) {
                                    out.push(cp1252_to_char(b));
                                }
                            }
                        }
                        '\\' | '{' | '}' if !state.skip => out.push(next),
                        '~' if !state.skip => out.push('\u{00A0}'),
                        '\n' | '\r' if !state.skip => out.push('\n'),
                        _ => {}
                    }
                }
            }
            '\r' | '\n' => i += 1,
            _ => {
                if pending_fallback > 0 {
                    pending_fallback -= 1;
                } else if !state.skip {
                    out.push(c);
                }
                i += 1;
            }
        }
    }

    out
}

/// Windows-1252 for the 0x80..=0x9F block, Latin-1 elsewhere.
fn cp1252_to_char(b: u8) -> char {
    const HIGH: [char; 32] = [
        '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}',
        '\u{2021}', '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}',
        '\u{017D}', '\u{FFFD}', '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}',
        '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}',
        '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
    ];
    match b {
        0x80..=0x9F => HIGH[(b - 0x80) as usize],
        _ => b as char,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::collapse_whitespace;

    #[test]
    fn strips_tables_and_keeps_body() {
        let rtf = r"{\rtf1\ansi\deff0{\fonttbl{\f0 Times New Roman;}}{\colortbl;\red0\green0\blue0;}
{\*\generator Riched20 10.0;}\f0\fs24 Market share rose.\par
Second line\line end}";
        assert_eq!(rtf_to_text(rtf), "Market share rose.\nSecond line\nend");
    }

    #[test]
    fn decodes_hex_and_unicode_escapes() {
        let rtf = r"{\rtf1 caf\'e9 \u25968?\u25454?\'93quoted\'94}";
        assert_eq!(collapse_whitespace(&rtf_to_text(rtf)), "café 数据\u{201C}quoted\u{201D}");
    }

    #[test]
    fn negative_unicode_and_escaped_braces() {
        let rtf = r"{\rtf1 \u-3913? \{literal\}}";
        assert_eq!(rtf_to_text(rtf), "\u{F0B7} {literal}");
    }

    #[test]
    fn info_group_is_skipped() {
        let rtf = r"{\rtf1{\info{\title Secret}{\author Someone}}Body}";
        assert_eq!(rtf_to_text(rtf), "Body");
    }
}
