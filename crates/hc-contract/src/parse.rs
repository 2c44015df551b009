// SPDX-License-Identifier: MIT OR Apache-2.0
//! Line-level scanner for the Python-style source subset.
//!
//! This is deliberately not a full grammar: the contract only needs the
//! *public surface*, so the scanner tracks indentation and bracket depth to
//! find top-level `def`/`class`/`__all__`/annotation statements and renders
//! them canonically. Pathological sources (unterminated signatures, NUL
//! bytes) fail scanning rather than producing a wrong contract.

use std::sync::LazyLock;

use regex::Regex;

static DEF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\(").expect("def regex"));
static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^class\s+([A-Za-z_]\w*)").expect("class regex"));
static ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_]\w*)\s*:\s*(.+?)\s*(?:=.*)?$").expect("annotation regex")
});
static STRING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']([^"']+)["']"#).expect("string regex"));
static COLON_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*:\s*").expect("colon regex"));
static EQ_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*=\s*").expect("eq regex"));

/// Statement keywords that look like annotations at column zero but are not.
const BLOCK_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "try", "except", "finally", "for", "while", "with", "match", "case",
];

/// The raw public surface collected from one file, pre-sorting.
#[derive(Debug, Default)]
pub(crate) struct Surface {
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub exports: Vec<String>,
    pub type_signatures: Vec<String>,
}

/// Scan `source` for its public surface.
pub(crate) fn scan_source(source: &str) -> Result<Surface, String> {
    if source.contains('\0') {
        return Err("embedded NUL byte".to_string());
    }

    let lines: Vec<&str> = source.lines().collect();
    let mut surface = Surface::default();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim_start();
        let at_top_level = line.len() == trimmed.len();

        if !at_top_level || trimmed.is_empty() || trimmed.starts_with('#') {
            i += 1;
            continue;
        }

        if DEF_RE.is_match(trimmed) {
            let (signature, consumed) = join_until_colon(&lines, i)?;
            if let Some(rendered) = render_function(&signature) {
                surface.functions.push(rendered);
            }
            i += consumed;
            continue;
        }

        if CLASS_RE.is_match(trimmed) {
            let (entry, consumed) = scan_class(&lines, i)?;
            if let Some(entry) = entry {
                surface.classes.push(entry);
            }
            i += consumed;
            continue;
        }

        if trimmed.starts_with("__all__") {
            let (joined, consumed) = join_until_balanced(&lines, i);
            if let Some(rhs) = joined.split_once('=').map(|(_, rhs)| rhs) {
                for capture in STRING_RE.captures_iter(rhs) {
                    surface.exports.push(capture[1].to_string());
                }
            }
            i += consumed;
            continue;
        }

        if let Some(rendered) = render_annotation(trimmed) {
            surface.type_signatures.push(rendered);
        }
        i += 1;
    }

    Ok(surface)
}

/// Join lines starting at `start` until a `:` appears at bracket depth zero.
///
/// Returns the joined text (without the trailing colon) and the number of
/// lines consumed.
fn join_until_colon(lines: &[&str], start: usize) -> Result<(String, usize), String> {
    let mut joined = String::new();
    let mut depth: i32 = 0;

    for (offset, line) in lines[start..].iter().enumerate() {
        let mut effective = *line;
        for (pos, ch) in line.char_indices() {
            match ch {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                ':' if depth == 0 => {
                    joined.push_str(&line[..pos]);
                    return Ok((joined, offset + 1));
                }
                '#' if depth == 0 => {
                    effective = &line[..pos];
                    break;
                }
                _ => {}
            }
        }
        joined.push_str(effective);
        joined.push(' ');
    }

    Err(format!("unterminated signature at line {}", start + 1))
}

/// Join lines starting at `start` until all brackets are balanced.
fn join_until_balanced(lines: &[&str], start: usize) -> (String, usize) {
    let mut joined = String::new();
    let mut depth: i32 = 0;

    for (offset, line) in lines[start..].iter().enumerate() {
        joined.push_str(line);
        joined.push(' ');
        for ch in line.chars() {
            match ch {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                _ => {}
            }
        }
        if depth <= 0 {
            return (joined, offset + 1);
        }
    }
    (joined, lines.len() - start)
}

/// Scan a class block: header (possibly multi-line) plus its body.
///
/// Returns the canonical `"Name: method1, method2"` entry (or `None` for
/// private classes) and the number of lines consumed including the body.
fn scan_class(lines: &[&str], start: usize) -> Result<(Option<String>, usize), String> {
    let (header, header_lines) = join_until_colon(lines, start)?;
    let name = CLASS_RE
        .captures(header.trim())
        .map(|c| c[1].to_string())
        .ok_or_else(|| format!("malformed class header at line {}", start + 1))?;

    let mut methods: Vec<String> = Vec::new();
    let mut consumed = header_lines;
    let mut body_indent: Option<usize> = None;
    let mut i = start + header_lines;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            consumed += 1;
            i += 1;
            continue;
        }
        let indent = line.len() - trimmed.len();
        if indent == 0 {
            break; // end of class body
        }
        let body_indent = *body_indent.get_or_insert(indent);

        if indent == body_indent
            && let Some(captures) = DEF_RE.captures(trimmed)
        {
            let (_, sig_lines) = join_until_colon(&lines[i..], 0)?;
            let method = captures[1].to_string();
            if !method.starts_with('_') && !methods.contains(&method) {
                methods.push(method);
            }
            consumed += sig_lines;
            i += sig_lines;
            continue;
        }
        consumed += 1;
        i += 1;
    }

    if name.starts_with('_') {
        return Ok((None, consumed));
    }

    methods.sort();
    let entry = if methods.is_empty() {
        name
    } else {
        format!("{name}: {}", methods.join(", "))
    };
    Ok((Some(entry), consumed))
}

/// Render a joined `def` signature canonically, or `None` for private names.
fn render_function(signature: &str) -> Option<String> {
    let trimmed = signature.trim();
    let captures = DEF_RE.captures(trimmed)?;
    let name = &captures[1];
    if name.starts_with('_') {
        return None;
    }

    let open = trimmed.find('(')?;
    let close = matching_paren(trimmed, open)?;
    let params = &trimmed[open + 1..close];
    let rest = &trimmed[close + 1..];

    let rendered_params: Vec<String> = split_top_level(params)
        .into_iter()
        .map(normalize_fragment)
        .filter(|p| !p.is_empty())
        .collect();

    let ret = rest
        .split_once("->")
        .map(|(_, r)| normalize_fragment(r))
        .filter(|r| !r.is_empty());

    Some(match ret {
        Some(ret) => format!("{name}({}) -> {ret}", rendered_params.join(", ")),
        None => format!("{name}({})", rendered_params.join(", ")),
    })
}

/// Render a top-level `name: Type` annotation, or `None` when it is not a
/// public structural annotation.
fn render_annotation(line: &str) -> Option<String> {
    let captures = ANNOTATION_RE.captures(line)?;
    let name = &captures[1];
    if name.starts_with('_') || BLOCK_KEYWORDS.contains(&name) {
        return None;
    }
    let ty = normalize_fragment(&captures[2]);
    if ty.is_empty() {
        return None;
    }
    Some(format!("{name}: {ty}"))
}

/// Index of the `)` matching the `(` at byte offset `open`.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (pos, ch) in text[open..].char_indices() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + pos);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that sit at bracket depth zero.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut last = 0;
    for (pos, ch) in text.char_indices() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&text[last..pos]);
                last = pos + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[last..]);
    parts
}

/// Collapse whitespace runs and normalize `:` / `=` spacing.
fn normalize_fragment(fragment: &str) -> String {
    let collapsed = fragment.split_whitespace().collect::<Vec<_>>().join(" ");
    let colon_fixed = COLON_RE.replace_all(&collapsed, ": ");
    EQ_RE.replace_all(&colon_fixed, " = ").trim().to_string()
}
