use std::collections::BTreeMap;

use crate::errors::{AirError, Result};
use crate::ir::model::{DependencyInterner, ProjectMeta, ProjectModel};
use crate::types::*;

/// Blocks that may appear inside `<pir>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Meta,
    Units,
    Pool,
    Dependencies,
    Symbols,
    Profiles,
    Layout,
    Snippets,
}

impl Block {
    fn from_tag(tag: &str) -> Option<Block> {
        match tag {
            "meta" => Some(Block::Meta),
            "units" => Some(Block::Units),
            "dependency-pool" => Some(Block::Pool),
            "dependencies" => Some(Block::Dependencies),
            "symbols" => Some(Block::Symbols),
            "profiles" => Some(Block::Profiles),
            "layout" => Some(Block::Layout),
            "code-snippets" => Some(Block::Snippets),
            _ => None,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Block::Meta => "meta",
            Block::Units => "units",
            Block::Pool => "dependency-pool",
            Block::Dependencies => "dependencies",
            Block::Symbols => "symbols",
            Block::Profiles => "profiles",
            Block::Layout => "layout",
            Block::Snippets => "code-snippets",
        }
    }
}

/// Position inside a `<snippet>` element.
#[derive(Debug, Clone, PartialEq)]
enum SnippetState {
    Outside,
    Opened(UnitId),
    InCdata(UnitId, usize, Vec<String>),
    Closed(UnitId, String),
}

/// A line whose validation needs the whole document.
struct Pending<T> {
    line: usize,
    value: T,
}

struct PirParser<'a> {
    origin: &'a str,
    meta: ProjectMeta,
    units: Vec<(String, Language, String, String)>,
    pool: Vec<String>,
    deps: Vec<Pending<(String, Vec<String>)>>,
    symbols: Vec<Pending<(String, String, String, BTreeMap<String, String>)>>,
    profiles: Vec<ProfileMatch>,
    active: Option<String>,
    layout: Vec<LayoutEntry>,
    snippets: Vec<Pending<(String, String)>>,
}

/// Parses PIR text into a finalized [`ProjectModel`].
pub fn parse_pir(text: &str) -> Result<ProjectModel> {
    parse_pir_from(text, "<pir>")
}

/// Like [`parse_pir`], naming `origin` (usually a file path) in errors.
pub fn parse_pir_from(text: &str, origin: &str) -> Result<ProjectModel> {
    let mut parser = PirParser {
        origin,
        meta: ProjectMeta::default(),
        units: Vec::new(),
        pool: Vec::new(),
        deps: Vec::new(),
        symbols: Vec::new(),
        profiles: Vec::new(),
        active: None,
        layout: Vec::new(),
        snippets: Vec::new(),
    };
    parser.run(text)?;
    parser.finish()
}

impl<'a> PirParser<'a> {
    fn err(&self, line: usize, message: impl Into<String>) -> AirError {
        AirError::parse_at(self.origin, line, message)
    }

    fn run(&mut self, text: &str) -> Result<()> {
        let mut opened = false;
        let mut closed = false;
        let mut block: Option<(Block, usize)> = None;
        let mut seen: Vec<Block> = Vec::new();
        let mut snippet = SnippetState::Outside;
        let mut last_line = 0;

        for (i, raw) in text.lines().enumerate() {
            let lineno = i + 1;
            last_line = lineno;

            // CDATA bodies are taken verbatim.
            if let SnippetState::InCdata(uid, _, body) = &mut snippet {
                if raw.trim_end() == "]]>" {
                    let uid = *uid;
                    let content = body.join("\n");
                    snippet = SnippetState::Closed(uid, content);
                } else {
                    body.push(raw.to_string());
                }
                continue;
            }

            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if closed {
                return Err(self.err(lineno, "content after </pir>"));
            }
            if !opened {
                if line != "<pir>" {
                    return Err(self.err(lineno, "document must start with <pir>"));
                }
                opened = true;
                continue;
            }

            if let Some((current, start)) = block {
                if line == format!("</{}>", current.tag()) {
                    if current == Block::Snippets && snippet != SnippetState::Outside {
                        return Err(self.err(lineno, "unterminated <snippet>"));
                    }
                    block = None;
                    continue;
                }
                if line == "</pir>" {
                    return Err(self.err(start, format!("unclosed <{}>", current.tag())));
                }
                if let Some(tag) = block_tag(line) {
                    return Err(self.err(
                        lineno,
                        format!("unexpected tag {tag} inside <{}>", current.tag()),
                    ));
                }
                if current == Block::Snippets {
                    snippet = self.snippet_line(lineno, line, snippet)?;
                } else {
                    self.record(current, lineno, line)?;
                }
                continue;
            }

            if line == "</pir>" {
                closed = true;
                continue;
            }
            let Some(tag) = block_tag(line) else {
                return Err(self.err(lineno, format!("content outside any block: '{line}'")));
            };
            let name = tag.trim_start_matches('<').trim_end_matches('>');
            if name.starts_with('/') {
                return Err(self.err(lineno, format!("unbalanced closing tag {tag}")));
            }
            let Some(b) = Block::from_tag(name) else {
                return Err(self.err(lineno, format!("unknown block {tag}")));
            };
            if seen.contains(&b) {
                return Err(self.err(lineno, format!("duplicate block {tag}")));
            }
            seen.push(b);
            block = Some((b, lineno));
        }

        if let SnippetState::InCdata(_, start, _) = snippet {
            return Err(self.err(start, "unterminated CDATA section"));
        }
        if let Some((current, start)) = block {
            return Err(self.err(start, format!("unclosed <{}>", current.tag())));
        }
        if !opened {
            return Err(self.err(1, "missing <pir>"));
        }
        if !closed {
            return Err(self.err(last_line, "missing </pir>"));
        }
        Ok(())
    }

    fn snippet_line(
        &mut self,
        lineno: usize,
        line: &str,
        state: SnippetState,
    ) -> Result<SnippetState> {
        match state {
            SnippetState::Outside => {
                let uid = line
                    .strip_prefix("<snippet unit=\"")
                    .and_then(|rest| rest.strip_suffix("\">"))
                    .ok_or_else(|| self.err(lineno, format!("expected <snippet unit=\"uN\">, got '{line}'")))?;
                let uid = UnitId::parse(uid)
                    .ok_or_else(|| self.err(lineno, format!("bad snippet unit '{uid}'")))?;
                Ok(SnippetState::Opened(uid))
            }
            SnippetState::Opened(uid) => {
                if line != "<![CDATA[" {
                    return Err(self.err(lineno, "expected <![CDATA["));
                }
                Ok(SnippetState::InCdata(uid, lineno, Vec::new()))
            }
            SnippetState::Closed(uid, content) => {
                if line != "</snippet>" {
                    return Err(self.err(lineno, "expected </snippet>"));
                }
                self.snippets.push(Pending {
                    line: lineno,
                    value: (uid.to_string(), content),
                });
                Ok(SnippetState::Outside)
            }
            SnippetState::InCdata(..) => Ok(state),
        }
    }

    fn record(&mut self, block: Block, lineno: usize, line: &str) -> Result<()> {
        match block {
            Block::Meta => {
                let (key, value) = line
                    .split_once(':')
                    .ok_or_else(|| self.err(lineno, "meta line must be 'key: value'"))?;
                let (key, value) = (key.trim(), value.trim().to_string());
                match key {
                    "name" => self.meta.name = value,
                    "root" => self.meta.root = value,
                    "profile" => self.meta.profile = value,
                    // Derived from the units on write.
                    "lang" => {}
                    _ => self.meta.extra.push((key.to_string(), value)),
                }
            }
            Block::Units => self.unit_line(lineno, line)?,
            Block::Pool => {
                let (id, key) = line
                    .split_once(": ")
                    .ok_or_else(|| self.err(lineno, "pool line must be 'dN: verb:target'"))?;
                let expected = format!("d{}", self.pool.len());
                if id != expected {
                    return Err(self.err(lineno, format!("expected {expected}, found {id}")));
                }
                let key = key.trim();
                let valid = key
                    .split_once(':')
                    .is_some_and(|(verb, target)| !verb.is_empty() && !target.is_empty());
                if !valid {
                    return Err(self.err(lineno, format!("malformed dependency key '{key}'")));
                }
                if self.pool.iter().any(|k| k == key) {
                    return Err(self.err(lineno, format!("duplicate dependency key '{key}'")));
                }
                self.pool.push(key.to_string());
            }
            Block::Dependencies => {
                let parsed = line.split_once("->refs:[").and_then(|(uid, rest)| {
                    rest.strip_suffix(']')
                        .map(|ids| (uid.trim(), ids.split_whitespace()))
                });
                let Some((uid, ids)) = parsed else {
                    return Err(self.err(lineno, "dependency line must be 'uN->refs:[dI ...]'"));
                };
                self.deps.push(Pending {
                    line: lineno,
                    value: (uid.to_string(), ids.map(str::to_string).collect()),
                });
            }
            Block::Symbols => {
                let mut tokens = line.split_whitespace();
                let head = tokens.next().unwrap_or_default();
                let (name, uid) = head
                    .rsplit_once(':')
                    .ok_or_else(|| self.err(lineno, format!("symbol '{head}' lacks ':uN'")))?;
                if name.is_empty() {
                    return Err(self.err(lineno, "empty symbol name"));
                }
                let kind = tokens
                    .next()
                    .ok_or_else(|| self.err(lineno, format!("symbol '{name}' has no kind")))?;
                let mut attrs = BTreeMap::new();
                for token in tokens {
                    let token = token.trim_end_matches(',');
                    let (k, v) = token
                        .split_once('=')
                        .ok_or_else(|| self.err(lineno, format!("bad attribute '{token}'")))?;
                    attrs.insert(k.to_string(), v.to_string());
                }
                self.symbols.push(Pending {
                    line: lineno,
                    value: (name.to_string(), uid.to_string(), kind.to_string(), attrs),
                });
            }
            Block::Profiles => {
                let (name, rest) = line
                    .split_once(':')
                    .ok_or_else(|| self.err(lineno, "profile line must be 'name: ...'"))?;
                let (name, rest) = (name.trim(), rest.trim());
                if name == "active" {
                    self.active = Some(rest.to_string());
                    return Ok(());
                }
                let mut profile = ProfileMatch {
                    name: name.to_string(),
                    confidence: 0.0,
                    tags: Vec::new(),
                    signals: Vec::new(),
                };
                for token in rest.split_whitespace() {
                    let (k, v) = token
                        .split_once('=')
                        .ok_or_else(|| self.err(lineno, format!("bad profile field '{token}'")))?;
                    let list = || v.split(',').map(str::to_string).collect();
                    match k {
                        "confidence" => {
                            profile.confidence = v
                                .parse()
                                .map_err(|_| self.err(lineno, format!("bad confidence '{v}'")))?
                        }
                        "tags" => profile.tags = list(),
                        "signals" => profile.signals = list(),
                        _ => {}
                    }
                }
                self.profiles.push(profile);
            }
            Block::Layout => {
                let (key, value) = line
                    .split_once(':')
                    .ok_or_else(|| self.err(lineno, "layout line must be 'key: value'"))?;
                self.layout.push(LayoutEntry {
                    key: key.trim().to_string(),
                    value: value.trim().to_string(),
                });
            }
            Block::Snippets => {}
        }
        Ok(())
    }

    fn unit_line(&mut self, lineno: usize, line: &str) -> Result<()> {
        let (id, rest) = line
            .split_once(": ")
            .ok_or_else(|| self.err(lineno, "unit line must be 'uN: path type=...'"))?;
        let expected = format!("u{}", self.units.len());
        if id != expected {
            return Err(self.err(lineno, format!("unit ids must be positional: expected {expected}, found {id}")));
        }

        let mut tokens: Vec<&str> = rest.split(' ').collect();
        let mut language = None;
        let mut role = "lib".to_string();
        let mut module = "root".to_string();
        while let Some(last) = tokens.last() {
            match last.split_once('=') {
                Some(("type", v)) => language = Some(Language::from_tag(v)),
                Some(("role", v)) => role = v.to_string(),
                Some(("module", v)) => module = v.to_string(),
                _ => break,
            }
            tokens.pop();
        }
        let path = tokens.join(" ");
        let language = language.ok_or_else(|| self.err(lineno, format!("unit {id} has no type=")))?;
        if path.is_empty() {
            return Err(self.err(lineno, format!("unit {id} has no path")));
        }
        if self.units.iter().any(|(p, ..)| *p == path) {
            return Err(self.err(lineno, format!("duplicate unit path '{path}'")));
        }
        self.units.push((path, language, role, module));
        Ok(())
    }

    fn known_unit(&self, lineno: usize, text: &str) -> Result<UnitId> {
        UnitId::parse(text)
            .filter(|uid| uid.index() < self.units.len())
            .ok_or_else(|| self.err(lineno, format!("unknown unit '{text}'")))
    }

    fn finish(self) -> Result<ProjectModel> {
        let mut model = ProjectModel::new(self.meta.clone());
        for (path, language, role, module) in &self.units {
            model.add_unit(path, language.clone(), role, module);
        }

        for pending in &self.symbols {
            let (name, uid, kind, attrs) = &pending.value;
            let unit = self.known_unit(pending.line, uid)?;
            model.add_symbol(Symbol {
                name: name.clone(),
                unit,
                kind: kind.clone(),
                attrs: attrs.clone(),
            })?;
        }

        let mut refs: BTreeMap<UnitId, Vec<usize>> = BTreeMap::new();
        for pending in &self.deps {
            let (uid, ids) = &pending.value;
            let unit = self.known_unit(pending.line, uid)?;
            if refs.contains_key(&unit) {
                return Err(self.err(pending.line, format!("duplicate dependency line for {uid}")));
            }
            let mut list = Vec::with_capacity(ids.len());
            for id in ids {
                let idx = id
                    .strip_prefix('d')
                    .and_then(|n| n.parse::<usize>().ok())
                    .filter(|&n| n < self.pool.len())
                    .ok_or_else(|| self.err(pending.line, format!("unknown dependency id '{id}'")))?;
                list.push(idx);
            }
            refs.insert(unit, list);
        }
        model.set_dependencies(DependencyInterner::from_pool(self.pool.clone(), refs));

        for entry in &self.layout {
            model.add_layout(&entry.key, &entry.value);
        }
        for pending in &self.snippets {
            let (uid, content) = &pending.value;
            let unit = self.known_unit(pending.line, uid)?;
            model.add_snippet(unit, content)?;
        }

        model.set_profiles(self.profiles);
        if self.active.is_some() {
            model.set_active_profile(self.active);
        }
        Ok(model)
    }
}

/// Returns the line if it looks like a bare block tag (`<x>` or `</x>`).
fn block_tag(line: &str) -> Option<&str> {
    let is_tag = line.starts_with('<')
        && line.ends_with('>')
        && !line.starts_with("<snippet")
        && !line.starts_with("</snippet")
        && !line.starts_with("<![CDATA[")
        && !line[1..line.len() - 1].contains(char::is_whitespace);
    is_tag.then_some(line)
}
