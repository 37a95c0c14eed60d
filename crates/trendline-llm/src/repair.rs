//! Lenient JSON repair
//!
//! A single forward pass that rewrites the usual generator slips into strict
//! JSON:
//! - trailing and duplicated commas
//! - unquoted keys and bare-word values
//! - single-quoted strings
//! - `//`, `/* */` and `#` comments
//! - Python/JS literals (`True`, `False`, `None`, `undefined`, `NaN`, `Infinity`)
//! - missing commas between values
//! - unescaped quotes and raw control characters inside strings
//! - brackets left open at the end of a truncated response
//!
//! The output is not guaranteed to parse; callers still run a strict parse on
//! it.

pub fn repair_json(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    // Expected closers for every open container.
    let mut stack: Vec<char> = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => {
                separate_values(&mut out, &stack);
                i = copy_string(&chars, i, &mut out);
            }
            '/' if chars.get(i + 1) == Some(&'/') => i = skip_line(&chars, i),
            '#' => i = skip_line(&chars, i),
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i = (i + 2).min(chars.len());
            }
            '{' | '[' => {
                separate_values(&mut out, &stack);
                out.push(c);
                stack.push(if c == '{' { '}' } else { ']' });
                i += 1;
            }
            '}' | ']' => {
                // Close any containers left open inside this one; drop strays.
                if let Some(pos) = stack.iter().rposition(|&e| e == c) {
                    while stack.len() > pos {
                        if let Some(closer) = stack.pop() {
                            drop_trailing_comma(&mut out);
                            out.push(closer);
                        }
                    }
                }
                i += 1;
            }
            ',' => {
                match last_significant(&out) {
                    None | Some(',') | Some('{') | Some('[') | Some(':') => {}
                    _ => out.push(','),
                }
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && starts_number(&chars, i)) => {
                separate_values(&mut out, &stack);
                i = copy_number(&chars, i, &mut out);
            }
            c if c.is_alphabetic() || c == '_' || c == '$' || c == '-' => {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '$' | '-' | '.'))
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                separate_values(&mut out, &stack);
                if next_significant(&chars, i) == Some(':') {
                    push_quoted(&mut out, &word);
                } else {
                    match word.as_str() {
                        "true" | "True" | "TRUE" => out.push_str("true"),
                        "false" | "False" | "FALSE" => out.push_str("false"),
                        "null" | "Null" | "NULL" | "None" | "nil" | "undefined" | "NaN"
                        | "Infinity" | "-Infinity" => out.push_str("null"),
                        _ => push_quoted(&mut out, &word),
                    }
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    drop_trailing_comma(&mut out);
    while let Some(closer) = stack.pop() {
        drop_trailing_comma(&mut out);
        out.push(closer);
    }
    out
}

/// Copy a quoted string starting at `start`, re-emitting it double-quoted.
/// Returns the index just past the closing quote.
fn copy_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    out.push('"');
    let mut i = start + 1;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '\\' => match chars.get(i + 1) {
                Some('u') if chars.len() >= i + 6 && chars[i + 2..i + 6].iter().all(|c| c.is_ascii_hexdigit()) => {
                    out.extend(&chars[i..i + 6]);
                    i += 6;
                }
                Some(&n) if matches!(n, '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't') => {
                    out.push('\\');
                    out.push(n);
                    i += 2;
                }
                Some('\'') => {
                    out.push('\'');
                    i += 2;
                }
                _ => {
                    out.push_str("\\\\");
                    i += 1;
                }
            },
            c if c == quote => {
                if closes_string(chars, i + 1) {
                    out.push('"');
                    return i + 1;
                }
                out.push_str("\\\"");
                i += 1;
            }
            '"' => {
                out.push_str("\\\"");
                i += 1;
            }
            '\n' => {
                out.push_str("\\n");
                i += 1;
            }
            '\r' => {
                out.push_str("\\r");
                i += 1;
            }
            '\t' => {
                out.push_str("\\t");
                i += 1;
            }
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    // Unterminated: the response was cut off mid-string.
    out.push('"');
    i
}

/// A quote closes its string when what follows can only be structure.
fn closes_string(chars: &[char], from: usize) -> bool {
    let mut k = from;
    let mut saw_newline = false;
    while k < chars.len() && chars[k].is_whitespace() {
        saw_newline |= chars[k] == '\n';
        k += 1;
    }
    match chars.get(k) {
        None => true,
        Some(',') | Some('}') | Some(']') | Some(':') => true,
        Some('"') | Some('\'') | Some('{') | Some('[') => saw_newline,
        Some('/') => matches!(chars.get(k + 1), Some('/') | Some('*')),
        Some(_) => false,
    }
}

fn copy_number(chars: &[char], start: usize, out: &mut String) -> usize {
    let mut i = start;
    let mut raw = String::new();
    while i < chars.len() && (chars[i].is_ascii_digit() || matches!(chars[i], '.' | 'e' | 'E' | '+' | '-')) {
        raw.push(chars[i]);
        i += 1;
    }
    let mut num = raw.trim_start_matches('+').to_string();
    if num.starts_with('.') {
        num.insert(0, '0');
    } else if num.starts_with("-.") {
        num.insert(1, '0');
    }
    if num.ends_with('.') {
        num.push('0');
    }
    out.push_str(&num);
    i
}

fn starts_number(chars: &[char], i: usize) -> bool {
    matches!(chars.get(i + 1), Some(c) if c.is_ascii_digit() || *c == '.')
}

fn skip_line(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i] != '\n' {
        i += 1;
    }
    i
}

fn next_significant(chars: &[char], mut i: usize) -> Option<char> {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    chars.get(i).copied()
}

fn last_significant(out: &str) -> Option<char> {
    out.trim_end().chars().last()
}

/// Insert a comma when a new value directly follows a finished one.
fn separate_values(out: &mut String, stack: &[char]) {
    if stack.is_empty() {
        return;
    }
    if let Some(last) = last_significant(out) {
        if last == '"' || last == '}' || last == ']' || last.is_ascii_alphanumeric() {
            out.push(',');
        }
    }
}

fn drop_trailing_comma(out: &mut String) {
    let trimmed_len = out.trim_end().len();
    if out[..trimmed_len].ends_with(',') {
        out.truncate(trimmed_len - 1);
    }
}

fn push_quoted(out: &mut String, word: &str) {
    out.push('"');
    for c in word.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}
