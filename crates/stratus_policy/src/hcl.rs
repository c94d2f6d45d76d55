//! Line-oriented reader for Terraform HCL.
//!
//! This is not a full HCL parser. It understands what generated and typical
//! hand-written Terraform looks like: labelled blocks, nested blocks, one
//! attribute per line, one-line blocks, multi-line list/map values, heredocs
//! and comments. A statement it cannot place that carries a brace is rejected
//! with [`PolicyError::MalformedCode`], so callers never see a partial tree.

use regex::Regex;

use crate::error::{PolicyError, PolicyResult};

/// A parsed block body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HclBody {
    pub attributes: Vec<(String, String)>,
    pub blocks: Vec<HclBlockNode>,
}

/// A named block with its labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HclBlockNode {
    pub name: String,
    pub labels: Vec<String>,
    pub body: HclBody,
}

/// A `resource "<type>" "<name>"` block.
#[derive(Debug, Clone, Copy)]
pub struct Resource<'a> {
    pub resource_type: &'a str,
    pub name: &'a str,
    pub body: &'a HclBody,
}

impl HclBody {
    /// Raw value of a direct attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First direct child block with the given name.
    pub fn block(&self, name: &str) -> Option<&HclBlockNode> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Resolve a dotted path such as `settings.ip_configuration.ipv4_enabled`.
    pub fn lookup(&self, path: &[&str]) -> Option<&str> {
        match path {
            [] => None,
            [key] => self.attribute(key),
            [head, key] => match self.block(head) {
                Some(b) => b.body.lookup(&[key]),
                None => self.attribute(head).and_then(|map| map_entry(map, key)),
            },
            [head, rest @ ..] => self.block(head).and_then(|b| b.body.lookup(rest)),
        }
    }
}

/// Value of `key` inside a `{ k = v }` map expression.
fn map_entry<'a>(map: &'a str, key: &str) -> Option<&'a str> {
    let inner = map.trim().strip_prefix('{')?.strip_suffix('}')?;
    let mut depth = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;
    let mut entries = Vec::new();

    for (idx, c) in inner.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' | '(' => depth += 1,
            ']' | '}' | ')' => depth -= 1,
            '\n' | ',' if depth == 0 => {
                entries.push(&inner[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    entries.push(&inner[start..]);

    entries.into_iter().find_map(|entry| {
        let (k, v) = entry.split_once(['=', ':'])?;
        (k.trim().trim_matches('"') == key).then(|| v.trim())
    })
}

/// A parsed HCL document.
#[derive(Debug, Clone, Default)]
pub struct HclDocument {
    root: HclBody,
}

impl HclDocument {
    pub fn parse(code: &str) -> PolicyResult<Self> {
        Parser::new()?.parse(code)
    }

    pub fn root(&self) -> &HclBody {
        &self.root
    }

    /// All top-level resource blocks in document order.
    pub fn resources(&self) -> impl Iterator<Item = Resource<'_>> {
        self.root
            .blocks
            .iter()
            .filter(|b| b.name == "resource" && b.labels.len() == 2)
            .map(|b| Resource {
                resource_type: &b.labels[0],
                name: &b.labels[1],
                body: &b.body,
            })
    }
}

struct Parser {
    block_re: Regex,
    header_re: Regex,
    label_re: Regex,
    attr_re: Regex,
    heredoc_re: Regex,
}

struct OpenBlock {
    name: String,
    labels: Vec<String>,
    body: HclBody,
    line: usize,
}

impl Parser {
    fn new() -> PolicyResult<Self> {
        Ok(Self {
            block_re: Regex::new(r#"^([A-Za-z_][\w-]*)((?:\s+(?:"[^"]*"|[A-Za-z_][\w-]*))*)\s*\{$"#)?,
            header_re: Regex::new(r#"^[A-Za-z_][\w-]*(?:\s+(?:"[^"]*"|[A-Za-z_][\w-]*))*\s*\{"#)?,
            label_re: Regex::new(r#""([^"]*)"|([A-Za-z_][\w-]*)"#)?,
            attr_re: Regex::new(r"^([A-Za-z_][\w.-]*)\s*=\s*(.*)$")?,
            heredoc_re: Regex::new(r"^<<-?([A-Za-z_]\w*)$")?,
        })
    }

    fn parse(&self, code: &str) -> PolicyResult<HclDocument> {
        let mut stack = vec![OpenBlock {
            name: String::new(),
            labels: Vec::new(),
            body: HclBody::default(),
            line: 0,
        }];
        let lines: Vec<&str> = code.lines().collect();
        let mut i = 0;

        while i < lines.len() {
            let line_no = i + 1;
            let line = strip_comment(lines[i]).trim().to_string();
            i += 1;

            for segment in self.split_inline(&line) {
                self.statement(&segment, line_no, &lines, &mut i, &mut stack)?;
            }
        }

        if stack.len() > 1 {
            let unclosed = &stack[stack.len() - 1];
            return Err(PolicyError::MalformedCode {
                line: unclosed.line,
                reason: format!("unclosed block '{}'", unclosed.name),
            });
        }

        let root = stack.pop().map(|b| b.body).unwrap_or_default();
        Ok(HclDocument { root })
    }

    /// Break a physical line into statements: block headers, closing braces
    /// and attributes, so `a "b" { c = 1 }` reads like its multi-line form.
    fn split_inline(&self, line: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut rest = line.trim();

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('}') {
                out.push("}".to_string());
                rest = after.trim_start();
            } else if let Some(m) = self.header_re.find(rest) {
                out.push(m.as_str().trim().to_string());
                rest = rest[m.end()..].trim_start();
            } else {
                let end = statement_end(rest);
                out.push(rest[..end].trim().to_string());
                rest = rest[end..].trim_start();
            }
        }

        out
    }

    /// Apply one statement to the block stack. Multi-line values and heredocs
    /// consume the following physical lines.
    fn statement(
        &self,
        segment: &str,
        line_no: usize,
        lines: &[&str],
        i: &mut usize,
        stack: &mut Vec<OpenBlock>,
    ) -> PolicyResult<()> {
        if segment == "}" {
            if stack.len() == 1 {
                return Err(PolicyError::MalformedCode {
                    line: line_no,
                    reason: "unexpected closing brace".to_string(),
                });
            }
            if let Some(done) = stack.pop() {
                let node = HclBlockNode {
                    name: done.name,
                    labels: done.labels,
                    body: done.body,
                };
                if let Some(parent) = stack.last_mut() {
                    parent.body.blocks.push(node);
                }
            }
            return Ok(());
        }

        if let Some(caps) = self.block_re.captures(segment) {
            let labels = caps
                .get(2)
                .map(|m| {
                    self.label_re
                        .captures_iter(m.as_str())
                        .filter_map(|c| c.get(1).or_else(|| c.get(2)).map(|l| l.as_str().to_string()))
                        .collect()
                })
                .unwrap_or_default();
            stack.push(OpenBlock {
                name: caps[1].to_string(),
                labels,
                body: HclBody::default(),
                line: line_no,
            });
            return Ok(());
        }

        let Some(caps) = self.attr_re.captures(segment) else {
            if segment.contains(|c: char| c == '{' || c == '}') {
                return Err(PolicyError::MalformedCode {
                    line: line_no,
                    reason: format!("unrecognised statement '{}'", segment),
                });
            }
            return Ok(());
        };

        let key = caps[1].to_string();
        let mut value = caps[2].trim().to_string();

        if let Some(marker) = self.heredoc_re.captures(&value).map(|c| c[1].to_string()) {
            let mut content = Vec::new();
            loop {
                let Some(next) = lines.get(*i) else {
                    return Err(PolicyError::MalformedCode {
                        line: line_no,
                        reason: format!("unterminated heredoc '{}'", marker),
                    });
                };
                *i += 1;
                if next.trim() == marker {
                    break;
                }
                content.push(*next);
            }
            value = content.join("\n");
        } else {
            let mut depth = bracket_depth(&value);
            while depth > 0 {
                let Some(next) = lines.get(*i) else {
                    return Err(PolicyError::MalformedCode {
                        line: line_no,
                        reason: format!("unterminated value for '{}'", key),
                    });
                };
                *i += 1;
                let next = strip_comment(next);
                depth += bracket_depth(next);
                value.push('\n');
                value.push_str(next.trim());
            }
        }

        if let Some(current) = stack.last_mut() {
            current.body.attributes.push((key, value));
        }
        Ok(())
    }
}

/// Byte offset where a statement ends: the first closing brace that is not
/// matched inside the statement itself, or the end of the text.
fn statement_end(s: &str) -> usize {
    let mut depth = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' | '(' => depth += 1,
            '}' if depth == 0 => return idx,
            ']' | '}' | ')' => depth -= 1,
            _ => {}
        }
    }
    s.len()
}

/// Remove a trailing `#` or `//` comment that is not inside a string.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    let bytes = line.as_bytes();

    for (idx, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'#' => return &line[..idx],
            b'/' if bytes.get(idx + 1) == Some(&b'/') => return &line[..idx],
            _ => {}
        }
    }
    line
}

/// Net count of opening minus closing brackets outside string literals.
fn bracket_depth(s: &str) -> i32 {
    let mut depth = 0;
    let mut in_string = false;
    let mut escaped = false;

    for c in s.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' | '(' => depth += 1,
            ']' | '}' | ')' => depth -= 1,
            _ => {}
        }
    }
    depth
}
