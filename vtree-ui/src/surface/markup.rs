//! Tolerant markup parsing and escaping for raw content.

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MarkupNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<MarkupNode>,
    },
    Text(String),
}

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

struct OpenElement {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<MarkupNode>,
}

/// Parse a markup fragment. Unclosed elements are closed at the end of input and
/// stray closing tags are dropped.
pub(crate) fn parse(input: &str) -> Vec<MarkupNode> {
    let mut stack = vec![OpenElement {
        tag: String::new(),
        attrs: Vec::new(),
        children: Vec::new(),
    }];
    let mut rest = input;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("<!--") {
            rest = match after.find("-->") {
                Some(end) => &after[end + 3..],
                None => "",
            };
        } else if let Some(after) = rest.strip_prefix("</") {
            let end = after.find('>').unwrap_or(after.len());
            let name = after[..end].trim().to_ascii_lowercase();
            rest = after.get(end + 1..).unwrap_or("");
            if let Some(pos) = stack.iter().rposition(|open| open.tag == name) {
                if pos > 0 {
                    while stack.len() > pos {
                        close_top(&mut stack);
                    }
                }
            }
        } else if starts_tag(rest) {
            let (open, self_closing, remaining) = parse_open_tag(&rest[1..]);
            rest = remaining;
            if self_closing || is_void(&open.tag) {
                if let Some(top) = stack.last_mut() {
                    top.children.push(MarkupNode::Element {
                        tag: open.tag,
                        attrs: open.attrs,
                        children: Vec::new(),
                    });
                }
            } else {
                stack.push(open);
            }
        } else {
            // Text runs up to the next thing that looks like markup
            let mut end = rest.len();
            for (idx, ch) in rest.char_indices().skip(1) {
                if ch == '<' && (starts_tag(&rest[idx..]) || rest[idx..].starts_with("</")) {
                    end = idx;
                    break;
                }
            }
            let text = decode_entities(&rest[..end]);
            rest = &rest[end..];
            let Some(top) = stack.last_mut() else { break };
            if let Some(MarkupNode::Text(prev)) = top.children.last_mut() {
                prev.push_str(&text);
            } else {
                top.children.push(MarkupNode::Text(text));
            }
        }
    }

    while stack.len() > 1 {
        close_top(&mut stack);
    }
    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn starts_tag(input: &str) -> bool {
    let mut chars = input.chars();
    chars.next() == Some('<') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

fn close_top(stack: &mut Vec<OpenElement>) {
    if let Some(open) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(MarkupNode::Element {
                tag: open.tag,
                attrs: open.attrs,
                children: open.children,
            });
        }
    }
}

/// Parses `name attr="v" ...>` (the leading `<` already consumed)
fn parse_open_tag(input: &str) -> (OpenElement, bool, &str) {
    let name_end = input
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':'))
        .unwrap_or(input.len());
    let tag = input[..name_end].to_ascii_lowercase();
    let mut rest = &input[name_end..];
    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        if let Some(after) = rest.strip_prefix("/>") {
            self_closing = true;
            rest = after;
            break;
        }
        if let Some(after) = rest.strip_prefix('>') {
            rest = after;
            break;
        }
        if let Some(after) = rest.strip_prefix('/') {
            rest = after;
            continue;
        }

        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        rest = rest[name_end..].trim_start();

        let value = if let Some(after) = rest.strip_prefix('=') {
            let after = after.trim_start();
            match after.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let body = &after[1..];
                    let end = body.find(quote).unwrap_or(body.len());
                    rest = body.get(end + 1..).unwrap_or("");
                    decode_entities(&body[..end])
                }
                _ => {
                    let end = after
                        .find(|c: char| c.is_whitespace() || c == '>')
                        .unwrap_or(after.len());
                    rest = &after[end..];
                    decode_entities(&after[..end])
                }
            }
        } else {
            String::new()
        };

        if !name.is_empty() {
            attrs.push((name, value));
        }
    }

    (
        OpenElement {
            tag,
            attrs,
            children: Vec::new(),
        },
        self_closing,
        rest,
    )
}

pub(crate) fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let entity = [
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&amp;", '&'),
            ("&quot;", '"'),
            ("&#39;", '\''),
        ]
        .into_iter()
        .find(|(name, _)| rest.starts_with(name));
        match entity {
            Some((name, ch)) => {
                out.push(ch);
                rest = &rest[name.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

pub(crate) fn escape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn escape_attr(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(ch),
        }
    }
    out
}
