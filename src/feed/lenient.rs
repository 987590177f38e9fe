// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Best-effort repair of feed markup that a strict XML reader rejects.
//!
//! Real-world feeds routinely contain bare ampersands, HTML entities such as
//! `&nbsp;` that XML does not define, and stray control characters. The
//! first pass escapes the first two so they survive as literal text and
//! drops the third.
//!
//! The second pass fixes structure. Raw HTML inside text-only elements such
//! as `description` is escaped so it reaches the text as written. Elsewhere
//! an end tag closes every element still open above its match, end tags
//! without a match are dropped, and whatever is open at the end of the
//! document is closed there. CDATA sections, comments and declarations are
//! copied untouched by both passes.

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";
const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

/// Sections copied as they are, checked in order
const VERBATIM: &[(&str, &str)] = &[
    (CDATA_OPEN, CDATA_CLOSE),
    (COMMENT_OPEN, COMMENT_CLOSE),
    ("<?", "?>"),
    ("<!", ">"),
];

/// Elements that only ever carry text; markup inside them is escaped
const TEXT_ELEMENTS: &[&str] = &[
    "title",
    "description",
    "author",
    "managingEditor",
    "pubDate",
    "guid",
    "content:encoded",
    "itunes:title",
    "itunes:subtitle",
    "itunes:summary",
    "itunes:author",
];

/// Longest entity name considered when deciding whether `&` starts a reference
const MAX_ENTITY_LEN: usize = 10;

/// Rewrite `input` so that a strict XML reader accepts it
pub fn repair_markup(input: &[u8]) -> String {
    balance_elements(&escape_entities(input))
}

fn escape_entities(input: &[u8]) -> String {
    let text = String::from_utf8_lossy(input);
    let mut out = String::with_capacity(text.len() + 64);
    let mut rest: &str = &text;

    while !rest.is_empty() {
        if let Some(after) = copy_verbatim(rest, CDATA_OPEN, CDATA_CLOSE, &mut out) {
            rest = after;
            continue;
        }
        if let Some(after) = copy_verbatim(rest, COMMENT_OPEN, COMMENT_CLOSE, &mut out) {
            rest = after;
            continue;
        }

        let mut chars = rest.chars();
        let Some(c) = chars.next() else { break };

        match c {
            '&' if !starts_xml_reference(&rest[1..]) => out.push_str("&amp;"),
            c if is_forbidden_control(c) => {}
            c => out.push(c),
        }

        rest = chars.as_str();
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Start,
    End,
    Empty,
}

/// One start, end or empty-element tag at the front of the input
#[derive(Debug)]
struct Tag<'a> {
    name: &'a str,
    kind: TagKind,
    /// Bytes from `<` through `>`
    len: usize,
}

impl<'a> Tag<'a> {
    /// Read the tag `rest` starts with; `None` when the `<` opens no tag
    fn read(rest: &'a str) -> Option<Self> {
        let after_lt = rest.strip_prefix('<')?;
        let (body, closing) = match after_lt.strip_prefix('/') {
            Some(body) => (body, true),
            None => (after_lt, false),
        };

        let name_len = body
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(body.len());
        let name = &body[..name_len];
        if !name.starts_with(|c: char| c.is_alphabetic() || c == '_')
            || !name
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
        {
            return None;
        }

        let end = tag_end(rest)?;
        let kind = if closing {
            TagKind::End
        } else if rest[..end].ends_with('/') {
            TagKind::Empty
        } else {
            TagKind::Start
        };

        Some(Self {
            name,
            kind,
            len: end + 1,
        })
    }
}

/// Index of the `>` ending the tag at the front of `rest`, skipping quoted values
fn tag_end(rest: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in rest.char_indices().skip(1) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '>' => return Some(i),
                '<' => return None,
                _ => {}
            },
        }
    }
    None
}

fn balance_elements(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 64);
    let mut open: Vec<&str> = Vec::new();
    let mut rest = input;

    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        rest = &rest[lt..];

        if let Some(after) = VERBATIM
            .iter()
            .find_map(|&(start, end)| copy_verbatim(rest, start, end, &mut out))
        {
            rest = after;
            continue;
        }

        let Some(tag) = Tag::read(rest) else {
            out.push_str("&lt;");
            rest = &rest[1..];
            continue;
        };
        let raw = &rest[..tag.len];
        rest = &rest[tag.len..];

        match tag.kind {
            TagKind::Empty => out.push_str(raw),
            TagKind::End => close_element(tag.name, &mut open, &mut out),
            TagKind::Start => {
                out.push_str(raw);
                if TEXT_ELEMENTS.contains(&tag.name) {
                    if let Some(after) = copy_text_content(rest, tag.name, &open, &mut out) {
                        rest = after;
                        continue;
                    }
                }
                open.push(tag.name);
            }
        }
    }
    out.push_str(rest);

    while let Some(name) = open.pop() {
        push_end_tag(name, &mut out);
    }

    out
}

/// Close `name` and everything opened inside it; an end tag with no open match is dropped
fn close_element(name: &str, open: &mut Vec<&str>, out: &mut String) {
    let Some(depth) = open.iter().rposition(|&o| o == name) else {
        return;
    };

    for unclosed in open.drain(depth..).rev() {
        push_end_tag(unclosed, out);
    }
}

fn push_end_tag(name: &str, out: &mut String) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Copy the content of text element `name` with stray markup escaped, through its end tag.
///
/// Gives up without writing anything when an ancestor's end tag or the end
/// of input comes first.
fn copy_text_content<'a>(
    rest: &'a str,
    name: &str,
    ancestors: &[&str],
    out: &mut String,
) -> Option<&'a str> {
    let mut text = String::new();
    let mut remaining = rest;

    loop {
        let lt = remaining.find('<')?;
        text.push_str(&remaining[..lt]);
        remaining = &remaining[lt..];

        if let Some(after) = copy_verbatim(remaining, CDATA_OPEN, CDATA_CLOSE, &mut text) {
            remaining = after;
            continue;
        }

        if let Some(after) = strip_end_tag(remaining, name) {
            out.push_str(&text);
            push_end_tag(name, out);
            return Some(after);
        }

        if Tag::read(remaining)
            .is_some_and(|tag| tag.kind == TagKind::End && ancestors.contains(&tag.name))
        {
            return None;
        }

        text.push_str("&lt;");
        remaining = &remaining[1..];
    }
}

/// The input after `</name>` when it starts with that end tag
fn strip_end_tag<'a>(rest: &'a str, name: &str) -> Option<&'a str> {
    rest.strip_prefix("</")?
        .strip_prefix(name)?
        .trim_start()
        .strip_prefix('>')
}

/// Copy a delimited section unchanged, returning the remainder after it
fn copy_verbatim<'a>(rest: &'a str, open: &str, close: &str, out: &mut String) -> Option<&'a str> {
    if !rest.starts_with(open) {
        return None;
    }

    match rest[open.len()..].find(close) {
        Some(pos) => {
            let end = open.len() + pos + close.len();
            out.push_str(&rest[..end]);
            Some(&rest[end..])
        }
        None => {
            out.push_str(rest);
            Some("")
        }
    }
}

/// Whether the text following an `&` forms a reference XML itself understands
fn starts_xml_reference(after_amp: &str) -> bool {
    let Some(end) = after_amp
        .char_indices()
        .take(MAX_ENTITY_LEN + 1)
        .find(|&(_, c)| c == ';')
        .map(|(i, _)| i)
    else {
        return false;
    };

    let name = &after_amp[..end];
    match name {
        "amp" | "lt" | "gt" | "quot" | "apos" => true,
        _ => {
            if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())
            } else if let Some(dec) = name.strip_prefix('#') {
                !dec.is_empty() && dec.chars().all(|c| c.is_ascii_digit())
            } else {
                false
            }
        }
    }
}

fn is_forbidden_control(c: char) -> bool {
    (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r')
}
