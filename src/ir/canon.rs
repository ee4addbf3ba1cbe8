//! Dependency target canonicalization.
//!
//! Two rewrites run before interning: standard-library imports collapse into
//! per-language `[stdlib:*]` buckets, and bracketed names that match exactly
//! one project symbol become exact `[uN#name]` references.

use std::collections::HashMap;

use crate::types::{Language, Symbol, UnitId};

const PY_STDLIB: &[&str] = &[
    "os", "sys", "argparse", "ast", "typing", "dataclasses", "abc", "re", "json", "math",
    "collections", "itertools", "functools", "pathlib", "datetime", "random", "hashlib",
    "logging", "threading", "multiprocessing", "io", "enum", "copy", "decimal", "fractions",
    "numbers", "queue", "secrets", "statistics", "string", "time", "uuid", "warnings", "weakref",
    "contextlib", "inspect", "pprint", "traceback", "types", "gc", "sysconfig",
];

const C_STDLIB: &[&str] = &[
    "stdio.h", "stdlib.h", "string.h", "stdint.h", "stddef.h", "stdbool.h", "assert.h",
    "ctype.h", "errno.h", "float.h", "limits.h", "math.h", "time.h", "unistd.h", "fcntl.h",
    "signal.h", "setjmp.h", "locale.h", "inttypes.h", "wchar.h", "wctype.h", "complex.h",
    "tgmath.h", "fenv.h", "stdalign.h", "stdnoreturn.h", "threads.h", "uchar.h",
];

const CPP_STDLIB: &[&str] = &[
    "algorithm", "array", "atomic", "bitset", "cassert", "cctype", "cerrno", "chrono", "cmath",
    "condition_variable", "cstddef", "cstdint", "cstdio", "cstdlib", "cstring", "deque",
    "exception", "filesystem", "fstream", "functional", "iomanip", "iostream", "istream",
    "iterator", "limits", "list", "map", "memory", "mutex", "numeric", "optional", "ostream",
    "queue", "random", "set", "span", "sstream", "stack", "stdexcept", "string", "string_view",
    "thread", "tuple", "type_traits", "unordered_map", "unordered_set", "utility", "variant",
    "vector",
];

const RUST_STD_ROOTS: &[&str] = &["std", "core", "alloc"];

const JAVA_STD_ROOTS: &[&str] = &["java", "javax"];

/// Returns the inside of a `[...]` target.
pub fn bracket_inner(target: &str) -> Option<&str> {
    target.strip_prefix('[')?.strip_suffix(']')
}

/// Standard-library bucket for `name` as seen from a unit in `language`.
pub fn stdlib_bucket(name: &str, language: &Language) -> Option<&'static str> {
    match language {
        Language::Python => {
            let root = name.split('.').next().unwrap_or(name);
            PY_STDLIB.contains(&root).then_some("py")
        }
        Language::C => C_STDLIB.contains(&name).then_some("c"),
        Language::Cpp => {
            if C_STDLIB.contains(&name) {
                Some("c")
            } else if CPP_STDLIB.contains(&name) {
                Some("cpp")
            } else {
                None
            }
        }
        Language::Rust => {
            let root = name.split("::").next().unwrap_or(name);
            RUST_STD_ROOTS.contains(&root).then_some("rust")
        }
        Language::Java => {
            let root = name.split('.').next().unwrap_or(name);
            (name.contains('.') && JAVA_STD_ROOTS.contains(&root)).then_some("java")
        }
        _ => None,
    }
}

/// Rewrites `[x]` to `[stdlib:<lang>]` when `x` is a standard-library name
/// for `language`. Everything else passes through unchanged.
pub fn canonicalize_target(target: &str, language: &Language) -> String {
    match bracket_inner(target).and_then(|inner| stdlib_bucket(inner, language)) {
        Some(bucket) => format!("[stdlib:{bucket}]"),
        None => target.to_string(),
    }
}

/// Maps each symbol name that occurs exactly once in the project to its unit.
pub fn unique_symbol_owners(symbols: &[Symbol]) -> HashMap<String, UnitId> {
    let mut counts: HashMap<&str, (usize, UnitId)> = HashMap::new();
    for s in symbols {
        counts
            .entry(s.name.as_str())
            .and_modify(|(n, _)| *n += 1)
            .or_insert((1, s.unit));
    }
    counts
        .into_iter()
        .filter(|(_, (n, _))| *n == 1)
        .map(|(name, (_, uid))| (name.to_string(), uid))
        .collect()
}

/// Rewrites `[name]` to `[uN#name]` if `name` has a unique owner.
pub fn resolve_symbol_target(target: &str, unique: &HashMap<String, UnitId>) -> String {
    match bracket_inner(target).and_then(|name| unique.get(name).map(|uid| (name, uid))) {
        Some((name, uid)) => format!("[{uid}#{name}]"),
        None => target.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_stdlib_uses_root_module() {
        assert_eq!(canonicalize_target("[os]", &Language::Python), "[stdlib:py]");
        assert_eq!(canonicalize_target("[os.path]", &Language::Python), "[stdlib:py]");
        assert_eq!(canonicalize_target("[numpy]", &Language::Python), "[numpy]");
    }

    #[test]
    fn test_stdlib_is_language_scoped() {
        // `time` is a Python module but not a C header name.
        assert_eq!(canonicalize_target("[time]", &Language::C), "[time]");
        assert_eq!(canonicalize_target("[stdio.h]", &Language::Python), "[stdio.h]");
        assert_eq!(canonicalize_target("[stdio.h]", &Language::Cpp), "[stdlib:c]");
        assert_eq!(canonicalize_target("[vector]", &Language::Cpp), "[stdlib:cpp]");
        assert_eq!(canonicalize_target("[vector]", &Language::C), "[vector]");
    }

    #[test]
    fn test_rust_and_java_roots() {
        assert_eq!(
            canonicalize_target("[std::collections::HashMap]", &Language::Rust),
            "[stdlib:rust]"
        );
        assert_eq!(canonicalize_target("[core::fmt]", &Language::Rust), "[stdlib:rust]");
        assert_eq!(canonicalize_target("[serde::Serialize]", &Language::Rust), "[serde::Serialize]");
        assert_eq!(canonicalize_target("[java.util.List]", &Language::Java), "[stdlib:java]");
        assert_eq!(
            canonicalize_target("[org.example.Util]", &Language::Java),
            "[org.example.Util]"
        );
    }

    #[test]
    fn test_unbracketed_targets_untouched() {
        assert_eq!(canonicalize_target("os", &Language::Python), "os");
        assert_eq!(canonicalize_target("u1", &Language::C), "u1");
    }

    #[test]
    fn test_symbol_resolution_requires_uniqueness() {
        let symbols = vec![
            Symbol::new("helper", UnitId(0), "func"),
            Symbol::new("helper", UnitId(2), "func"),
            Symbol::new("init", UnitId(1), "func"),
        ];
        let unique = unique_symbol_owners(&symbols);
        assert_eq!(resolve_symbol_target("[init]", &unique), "[u1#init]");
        assert_eq!(resolve_symbol_target("[helper]", &unique), "[helper]");
        assert_eq!(resolve_symbol_target("[printf]", &unique), "[printf]");
    }
}
