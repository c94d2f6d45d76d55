//! A small HCL writer.
//!
//! Blocks are assembled as a tree and serialized with `terraform fmt` style
//! layout: two-space indentation and `=` aligned across consecutive
//! attributes.

use stratus_policy::{SecureDefaults, SettingValue};

/// An attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HclValue {
    Bool(bool),
    Int(i64),
    Str(String),
    /// Unquoted expression such as `aws_vpc.network_1.id`.
    Expr(String),
    List(Vec<HclValue>),
    Map(Vec<(String, HclValue)>),
}

impl HclValue {
    pub fn expr(e: impl Into<String>) -> Self {
        HclValue::Expr(e.into())
    }

    pub fn exprs<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HclValue::List(items.into_iter().map(|s| HclValue::Expr(s.into())).collect())
    }

    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HclValue::List(items.into_iter().map(|s| HclValue::Str(s.into())).collect())
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<HclValue>,
    {
        HclValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    fn write(&self, indent: usize, out: &mut String) {
        match self {
            HclValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            HclValue::Int(n) => out.push_str(&n.to_string()),
            HclValue::Str(s) => {
                out.push('"');
                out.push_str(&escape(s));
                out.push('"');
            }
            HclValue::Expr(e) => out.push_str(e),
            HclValue::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write(indent, out);
                }
                out.push(']');
            }
            HclValue::Map(entries) if entries.is_empty() => out.push_str("{}"),
            HclValue::Map(entries) => {
                out.push_str("{\n");
                let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
                for (key, value) in entries {
                    push_indent(indent + 1, out);
                    out.push_str(&format!("{:width$} = ", key, width = width));
                    value.write(indent + 1, out);
                    out.push('\n');
                }
                push_indent(indent, out);
                out.push('}');
            }
        }
    }
}

impl From<bool> for HclValue {
    fn from(b: bool) -> Self {
        HclValue::Bool(b)
    }
}

impl From<i32> for HclValue {
    fn from(n: i32) -> Self {
        HclValue::Int(i64::from(n))
    }
}

impl From<i64> for HclValue {
    fn from(n: i64) -> Self {
        HclValue::Int(n)
    }
}

impl From<u32> for HclValue {
    fn from(n: u32) -> Self {
        HclValue::Int(i64::from(n))
    }
}

impl From<u16> for HclValue {
    fn from(n: u16) -> Self {
        HclValue::Int(i64::from(n))
    }
}

impl From<&str> for HclValue {
    fn from(s: &str) -> Self {
        HclValue::Str(s.to_string())
    }
}

impl From<String> for HclValue {
    fn from(s: String) -> Self {
        HclValue::Str(s)
    }
}

impl From<&SettingValue> for HclValue {
    fn from(value: &SettingValue) -> Self {
        match value {
            SettingValue::Bool(b) => HclValue::Bool(*b),
            SettingValue::Int(n) => HclValue::Int(*n),
            SettingValue::Text(s) => HclValue::Str(s.clone()),
            SettingValue::Reference(r) => HclValue::Expr(r.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Attr(String, HclValue),
    Block(HclBlock),
    Comment(String),
    Gap,
}

/// A block with a keyword, optional labels and a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HclBlock {
    keyword: String,
    labels: Vec<String>,
    items: Vec<Item>,
}

impl HclBlock {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            labels: Vec::new(),
            items: Vec::new(),
        }
    }

    /// `resource "<type>" "<name>" { ... }`
    pub fn resource(resource_type: &str, name: impl Into<String>) -> Self {
        Self::new("resource").label(resource_type).label(name)
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<HclValue>) -> Self {
        self.items.push(Item::Attr(key.into(), value.into()));
        self
    }

    /// Attribute whose value is an unquoted expression.
    pub fn expr(self, key: impl Into<String>, expr: impl Into<String>) -> Self {
        self.attr(key, HclValue::Expr(expr.into()))
    }

    pub fn block(mut self, block: HclBlock) -> Self {
        self.items.push(Item::Block(block));
        self
    }

    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.items.push(Item::Comment(text.into()));
        self
    }

    /// Blank line; also ends an alignment group.
    pub fn gap(mut self) -> Self {
        self.items.push(Item::Gap);
        self
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn get(&self, key: &str) -> Option<&HclValue> {
        self.items.iter().find_map(|item| match item {
            Item::Attr(k, v) if k == key => Some(v),
            _ => None,
        })
    }

    /// First unlabeled child block with the given keyword.
    pub fn child(&self, keyword: &str) -> Option<&HclBlock> {
        self.items.iter().find_map(|item| match item {
            Item::Block(b) if b.keyword == keyword && b.labels.is_empty() => Some(b),
            _ => None,
        })
    }

    fn child_mut_or_insert(&mut self, keyword: &str) -> Option<&mut HclBlock> {
        let is_child = |item: &Item| matches!(item, Item::Block(b) if b.keyword == keyword && b.labels.is_empty());
        if !self.items.iter().any(is_child) {
            self.items.push(Item::Block(HclBlock::new(keyword)));
        }
        self.items.iter_mut().find_map(|item| match item {
            Item::Block(b) if b.keyword == keyword && b.labels.is_empty() => Some(b),
            _ => None,
        })
    }

    fn map_attr_mut(&mut self, key: &str) -> Option<&mut Vec<(String, HclValue)>> {
        self.items.iter_mut().find_map(|item| match item {
            Item::Attr(k, HclValue::Map(entries)) if k == key => Some(entries),
            _ => None,
        })
    }

    /// Set an attribute, replacing an existing one in place.
    pub fn set(&mut self, key: &str, value: impl Into<HclValue>) {
        let value = value.into();
        for item in &mut self.items {
            if let Item::Attr(k, v) = item {
                if k == key {
                    *v = value;
                    return;
                }
            }
        }
        self.items.push(Item::Attr(key.to_string(), value));
    }

    /// Set an attribute by dotted path, creating nested blocks as needed.
    ///
    /// When the parent of the last segment is an existing map attribute, the
    /// value is written as an entry of that map instead.
    pub fn set_path(&mut self, path: &str, value: impl Into<HclValue>) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let Some(key) = segments.pop() else {
            return;
        };
        let mut target = self;
        let last = segments.len();
        for (pos, segment) in segments.into_iter().enumerate() {
            if pos + 1 == last {
                if let Some(entries) = target.map_attr_mut(segment) {
                    let value = value.into();
                    match entries.iter_mut().find(|(k, _)| k == key) {
                        Some((_, v)) => *v = value,
                        None => entries.push((key.to_string(), value)),
                    }
                    return;
                }
            }
            let Some(child) = target.child_mut_or_insert(segment) else {
                return;
            };
            target = child;
        }
        target.set(key, value);
    }

    /// Apply every recommended setting in merge order.
    pub fn with_defaults(mut self, defaults: &SecureDefaults) -> Self {
        for (key, value) in defaults.iter() {
            self.set_path(key, value);
        }
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write(0, &mut out);
        out
    }

    fn write(&self, indent: usize, out: &mut String) {
        push_indent(indent, out);
        out.push_str(&self.keyword);
        for label in &self.labels {
            out.push_str(&format!(" \"{}\"", escape(label)));
        }

        if self.items.is_empty() {
            out.push_str(" {}\n");
            return;
        }
        out.push_str(" {\n");

        let mut i = 0;
        while i < self.items.len() {
            match &self.items[i] {
                Item::Attr(..) => {
                    let end = self.items[i..]
                        .iter()
                        .position(|item| !matches!(item, Item::Attr(..)))
                        .map_or(self.items.len(), |p| i + p);
                    let group = &self.items[i..end];
                    let width = group
                        .iter()
                        .filter_map(|item| match item {
                            Item::Attr(k, _) => Some(k.len()),
                            _ => None,
                        })
                        .max()
                        .unwrap_or(0);
                    for item in group {
                        if let Item::Attr(key, value) = item {
                            push_indent(indent + 1, out);
                            out.push_str(&format!("{:width$} = ", key, width = width));
                            value.write(indent + 1, out);
                            out.push('\n');
                        }
                    }
                    i = end;
                    continue;
                }
                Item::Block(block) => {
                    if i > 0 && !matches!(self.items[i - 1], Item::Gap | Item::Comment(_)) {
                        out.push('\n');
                    }
                    block.write(indent + 1, out);
                    if matches!(self.items.get(i + 1), Some(Item::Attr(..))) {
                        out.push('\n');
                    }
                }
                Item::Comment(text) => {
                    push_indent(indent + 1, out);
                    out.push_str("# ");
                    out.push_str(text);
                    out.push('\n');
                }
                Item::Gap => out.push('\n'),
            }
            i += 1;
        }

        push_indent(indent, out);
        out.push_str("}\n");
    }
}

fn push_indent(level: usize, out: &mut String) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render blocks separated by blank lines.
pub fn render_blocks(blocks: &[HclBlock]) -> String {
    blocks.iter().map(HclBlock::render).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_aligned() {
        let block = HclBlock::resource("aws_vpc", "network_1")
            .attr("cidr_block", "10.0.0.0/16")
            .attr("enable_dns_support", true);

        assert_eq!(
            block.render(),
            "resource \"aws_vpc\" \"network_1\" {\n  cidr_block         = \"10.0.0.0/16\"\n  enable_dns_support = true\n}\n"
        );
    }

    #[test]
    fn test_empty_block_inline() {
        let block = HclBlock::new("provider").label("azurerm").block(HclBlock::new("features"));
        assert_eq!(block.render(), "provider \"azurerm\" {\n  features {}\n}\n");
    }

    #[test]
    fn test_map_and_list_values() {
        let block = HclBlock::new("locals")
            .attr("zones", HclValue::strings(["a", "b"]))
            .attr("tags", HclValue::map([("Name", "web"), ("ManagedBy", "stratus")]));

        let text = block.render();
        assert!(text.contains("zones = [\"a\", \"b\"]"));
        assert!(text.contains("  tags  = {\n    Name      = \"web\"\n    ManagedBy = \"stratus\"\n  }\n"));
    }

    #[test]
    fn test_set_path_creates_and_reuses_blocks() {
        let mut block = HclBlock::resource("google_sql_database_instance", "db_1")
            .block(HclBlock::new("settings").attr("tier", "db-f1-micro"));

        block.set_path("settings.ip_configuration.ipv4_enabled", false);
        block.set_path("settings.ip_configuration.require_ssl", true);
        block.set_path("settings.tier", "db-custom-1-3840");

        let settings = block.child("settings").unwrap();
        assert_eq!(settings.get("tier"), Some(&HclValue::Str("db-custom-1-3840".into())));
        let ip = settings.child("ip_configuration").unwrap();
        assert_eq!(ip.get("ipv4_enabled"), Some(&HclValue::Bool(false)));
        assert_eq!(ip.get("require_ssl"), Some(&HclValue::Bool(true)));
    }

    #[test]
    fn test_set_path_writes_into_existing_map() {
        let mut block = HclBlock::resource("openstack_compute_instance_v2", "server_1")
            .attr("metadata", HclValue::map([("role", "server")]));

        block.set_path("metadata.monitoring", "enabled");
        block.set_path("metadata.role", "web");

        assert!(block.child("metadata").is_none());
        assert_eq!(
            block.get("metadata"),
            Some(&HclValue::map([("role", "web"), ("monitoring", "enabled")]))
        );
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut block = HclBlock::new("x").attr("a", 1).attr("b", 2);
        block.set("a", 5);
        assert_eq!(block.render(), "x {\n  a = 5\n  b = 2\n}\n");
    }

    #[test]
    fn test_strings_escaped() {
        let block = HclBlock::new("x").attr("s", "say \"hi\"");
        assert!(block.render().contains(r#"s = "say \"hi\"""#));
    }

    #[test]
    fn test_output_parses_back() {
        let block = HclBlock::resource("aws_instance", "server_1")
            .attr("ami", "ami-1")
            .block(HclBlock::new("root_block_device").attr("encrypted", true))
            .attr("tags", HclValue::map([("Name", "server-1")]));

        let doc = stratus_policy::HclDocument::parse(&block.render()).unwrap();
        let resource = doc.resources().next().unwrap();
        assert_eq!(resource.body.lookup(&["root_block_device", "encrypted"]), Some("true"));
    }
}
