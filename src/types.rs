use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Units and languages
// ---------------------------------------------------------------------------

/// Positional identifier of a compilation unit (`u0`, `u1`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u32);

impl UnitId {
    /// Parses the canonical `u<N>` form. Leading zeros and signs are rejected
    /// so that every unit has exactly one textual spelling.
    pub fn parse(text: &str) -> Option<UnitId> {
        let digits = text.strip_prefix('u')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if digits.len() > 1 && digits.starts_with('0') {
            return None;
        }
        digits.parse().ok().map(UnitId)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

impl Serialize for UnitId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Source language of a unit, as written in the `type=` field of a unit line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Python,
    C,
    Cpp,
    Rust,
    Java,
    Asm,
    Ld,
    /// Any other tag, preserved verbatim.
    Other(String),
}

impl Language {
    /// Returns the tag used in PIR documents.
    pub fn as_tag(&self) -> &str {
        match self {
            Language::Python => "PY",
            Language::C => "C",
            Language::Cpp => "CPP",
            Language::Rust => "Rust",
            Language::Java => "JAVA",
            Language::Asm => "ASM",
            Language::Ld => "LD",
            Language::Other(tag) => tag,
        }
    }

    /// Parses a `type=` tag, accepting the common aliases.
    pub fn from_tag(tag: &str) -> Language {
        match tag.to_ascii_uppercase().as_str() {
            "PY" | "PYTHON" => Language::Python,
            "C" | "H" => Language::C,
            "CPP" | "CC" | "CXX" | "HPP" | "HH" | "HXX" => Language::Cpp,
            "RUST" | "RS" => Language::Rust,
            "JAVA" => Language::Java,
            "ASM" | "S" => Language::Asm,
            "LD" | "LDS" => Language::Ld,
            _ => Language::Other(tag.to_string()),
        }
    }

    /// Maps a file extension (without the dot) to a language. Unknown
    /// extensions become `Other` with the upper-cased extension as tag.
    pub fn from_extension(ext: &str) -> Language {
        match ext {
            "py" => Language::Python,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "rs" => Language::Rust,
            "java" => Language::Java,
            "s" | "S" | "asm" => Language::Asm,
            "ld" | "lds" => Language::Ld,
            other => Language::Other(other.to_ascii_uppercase()),
        }
    }

    /// Returns `true` for languages whose units pull in C headers.
    pub fn is_c_family(&self) -> bool {
        matches!(self, Language::C | Language::Cpp)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_tag())
    }
}

/// One source file in the project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unit {
    pub uid: UnitId,
    pub path: String,
    pub language: Language,
    pub role: String,
    pub module: String,
}

/// A named definition owned by exactly one unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Symbol {
    pub name: String,
    pub unit: UnitId,
    pub kind: String,
    pub attrs: BTreeMap<String, String>,
}

/// Rewrites `text` so it holds no whitespace and stays one PIR token.
///
/// Whitespace between two word characters becomes `_`; any other run is
/// dropped, so `(u8, u16)` becomes `(u8,u16)` and `operator new` becomes
/// `operator_new`.
pub fn compact_token(text: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut out = String::with_capacity(text.len());
    let mut gap = false;
    for c in text.trim().chars() {
        if c.is_whitespace() {
            gap = true;
            continue;
        }
        if gap && out.chars().last().is_some_and(is_word) && is_word(c) {
            out.push('_');
        }
        gap = false;
        out.push(c);
    }
    out
}

impl Symbol {
    pub fn new(name: &str, unit: UnitId, kind: &str) -> Self {
        Self {
            name: compact_token(name),
            unit,
            kind: kind.to_string(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.attrs.insert(key.to_string(), compact_token(value));
        self
    }

    /// Returns `true` if the symbol carries `entry=true`.
    pub fn is_entry(&self) -> bool {
        self.attrs.get("entry").map(String::as_str) == Some("true")
    }

    /// 1-based definition line recorded at scan time, if any.
    pub fn line(&self) -> Option<u32> {
        self.attrs.get("line").and_then(|l| l.parse().ok())
    }
}

/// One `<key>: <value>` record of the `<layout>` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutEntry {
    pub key: String,
    pub value: String,
}

/// Source excerpt attached to a unit in `<code-snippets>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snippet {
    pub unit: UnitId,
    pub content: String,
}

/// A semantic profile guessed from the finalized dependency pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileMatch {
    pub name: String,
    pub confidence: f64,
    pub tags: Vec<String>,
    pub signals: Vec<String>,
}

// ---------------------------------------------------------------------------
// Forward scanning
// ---------------------------------------------------------------------------

/// A symbol found by a forward extractor, before it is bound to a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedSymbol {
    pub name: String,
    pub kind: String,
    pub attrs: BTreeMap<String, String>,
}

impl ScannedSymbol {
    pub fn new(name: &str, kind: &str, line: u32) -> Self {
        let mut attrs = BTreeMap::new();
        attrs.insert("line".to_string(), line.to_string());
        Self {
            name: compact_token(name),
            kind: kind.to_string(),
            attrs,
        }
    }

    /// Marks the symbol as a program entry point.
    pub fn entry(mut self) -> Self {
        self.attrs.insert("entry".to_string(), "true".to_string());
        self
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.attrs.insert(key.to_string(), compact_token(value));
        self
    }

    pub fn is_entry(&self) -> bool {
        self.attrs.get("entry").map(String::as_str) == Some("true")
    }
}

/// A raw `(verb, target)` edge recorded while scanning a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDependency {
    pub verb: String,
    pub target: String,
}

impl RawDependency {
    pub fn new(verb: &str, target: impl Into<String>) -> Self {
        Self {
            verb: verb.to_string(),
            target: target.into(),
        }
    }

    /// Bracketed target helper: `RawDependency::bracketed("import", "os")`
    /// yields `import:[os]`.
    pub fn bracketed(verb: &str, name: &str) -> Self {
        Self::new(verb, format!("[{name}]"))
    }
}

/// Output of scanning a single source file.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub symbols: Vec<ScannedSymbol>,
    pub dependencies: Vec<RawDependency>,
    pub layout: Vec<LayoutEntry>,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Requests and resolution
// ---------------------------------------------------------------------------

/// What kind of thing a need asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NeedType {
    Unit,
    Symbol,
    Layout,
    Entry,
}

#[allow(clippy::should_implement_trait)]
impl NeedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NeedType::Unit => "unit",
            NeedType::Symbol => "symbol",
            NeedType::Layout => "layout",
            NeedType::Entry => "entry",
        }
    }

    /// Parses a need type, returning `None` for unrecognized values.
    pub fn from_str(s: &str) -> Option<NeedType> {
        match s {
            "unit" => Some(NeedType::Unit),
            "symbol" => Some(NeedType::Symbol),
            "layout" => Some(NeedType::Layout),
            "entry" => Some(NeedType::Entry),
            _ => None,
        }
    }
}

/// The requested shape of evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Exist,
    Definition,
    Api,
    Impl,
    Asm,
    Summary,
    Callchain,
}

#[allow(clippy::should_implement_trait)]
impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Exist => "exist",
            View::Definition => "definition",
            View::Api => "api",
            View::Impl => "impl",
            View::Asm => "asm",
            View::Summary => "summary",
            View::Callchain => "callchain",
        }
    }

    /// Parses a view name, returning `None` for unrecognized values.
    pub fn from_str(s: &str) -> Option<View> {
        match s {
            "exist" => Some(View::Exist),
            "definition" => Some(View::Definition),
            "api" => Some(View::Api),
            "impl" => Some(View::Impl),
            "asm" => Some(View::Asm),
            "summary" => Some(View::Summary),
            "callchain" => Some(View::Callchain),
            _ => None,
        }
    }
}

/// One query parsed from a request document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Need {
    #[serde(rename = "type")]
    pub need_type: NeedType,
    #[serde(rename = "ref")]
    pub reference: String,
    pub view: View,
}

impl Need {
    pub fn new(need_type: NeedType, reference: &str, view: View) -> Self {
        Self {
            need_type,
            reference: reference.to_string(),
            view,
        }
    }
}

/// Kind of target a reference resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Unit,
    Symbol,
    Layout,
}

/// A candidate offered when a reference is ambiguous.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    #[serde(rename = "ref")]
    pub reference: String,
    pub desc: String,
    pub kind: String,
    pub entry: bool,
    pub language: Language,
    pub path: String,
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reference, self.desc)
    }
}

/// Outcome of resolving a need's reference against the IR.
///
/// For layout targets `symbol` holds the layout key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRef {
    pub kind: RefKind,
    pub unit: Option<UnitId>,
    pub symbol: Option<String>,
    pub path: Option<String>,
    pub suggestions: Vec<Suggestion>,
}

impl ResolvedRef {
    pub fn unit(uid: UnitId, path: &str) -> Self {
        Self {
            kind: RefKind::Unit,
            unit: Some(uid),
            symbol: None,
            path: Some(path.to_string()),
            suggestions: Vec::new(),
        }
    }

    pub fn symbol(uid: UnitId, name: &str, path: &str) -> Self {
        Self {
            kind: RefKind::Symbol,
            unit: Some(uid),
            symbol: Some(name.to_string()),
            path: Some(path.to_string()),
            suggestions: Vec::new(),
        }
    }

    pub fn layout(key: &str) -> Self {
        Self {
            kind: RefKind::Layout,
            unit: None,
            symbol: Some(key.to_string()),
            path: None,
            suggestions: Vec::new(),
        }
    }

    pub fn missing() -> Self {
        Self {
            kind: RefKind::Symbol,
            unit: None,
            symbol: None,
            path: None,
            suggestions: Vec::new(),
        }
    }

    pub fn ambiguous(name: &str, suggestions: Vec<Suggestion>) -> Self {
        Self {
            kind: RefKind::Symbol,
            unit: None,
            symbol: Some(name.to_string()),
            path: None,
            suggestions,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.kind == RefKind::Symbol && self.symbol.is_none()
    }

    pub fn is_ambiguous(&self) -> bool {
        self.kind == RefKind::Symbol && self.unit.is_none() && self.symbol.is_some()
    }
}

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

/// Where an evidence record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceSource {
    Unit(UnitId),
    Layout,
    Unknown,
}

impl fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvidenceSource::Unit(uid) => write!(f, "{uid}"),
            EvidenceSource::Layout => f.write_str("layout"),
            EvidenceSource::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for EvidenceSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A titled block of lines, used for per-symbol groups inside a unit view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentGroup {
    pub title: String,
    pub lines: Vec<String>,
}

/// A single value in an evidence content bag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContentValue {
    Text(String),
    List(Vec<String>),
    Groups(Vec<ContentGroup>),
    Suggestions(Vec<Suggestion>),
}

impl From<&str> for ContentValue {
    fn from(s: &str) -> Self {
        ContentValue::Text(s.to_string())
    }
}

impl From<String> for ContentValue {
    fn from(s: String) -> Self {
        ContentValue::Text(s)
    }
}

impl From<Vec<String>> for ContentValue {
    fn from(items: Vec<String>) -> Self {
        ContentValue::List(items)
    }
}

/// Insertion-ordered key/value bag carried by an evidence record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Content {
    entries: Vec<(String, ContentValue)>,
}

impl Content {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing an earlier value in place.
    pub fn insert(&mut self, key: &str, value: impl Into<ContentValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<ContentValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ContentValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns the value of `key` when it is a plain text entry.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(ContentValue::Text(t)) => Some(t),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContentValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// The answer to one need.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evidence {
    #[serde(rename = "ref")]
    pub reference: String,
    pub view: View,
    pub source: EvidenceSource,
    pub content: Content,
}

/// Labels and control-flow lines of an assembly routine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AsmInfo {
    pub labels: Vec<String>,
    pub flow: Vec<String>,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Aggregate counts over a project IR.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IrStats {
    pub name: String,
    pub unit_count: usize,
    pub symbol_count: usize,
    pub dependency_count: usize,
    pub layout_count: usize,
    pub snippet_count: usize,
    pub units_by_language: BTreeMap<String, usize>,
    pub symbols_by_kind: BTreeMap<String, usize>,
    pub active_profile: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_token() {
        assert_eq!(compact_token("(u8, u16)"), "(u8,u16)");
        assert_eq!(compact_token("Pair<int, char>"), "Pair<int,char>");
        assert_eq!(compact_token("operator new"), "operator_new");
        assert_eq!(compact_token(" Widget "), "Widget");
    }

    #[test]
    fn test_symbol_attrs_stay_single_tokens() {
        let symbol = Symbol::new("show", UnitId(0), "func").with_attr("impl", "(u8, u16)");
        assert_eq!(symbol.attrs.get("impl").map(String::as_str), Some("(u8,u16)"));
    }
}
