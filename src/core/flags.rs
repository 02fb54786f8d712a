//! Per-source flag resolution for applications.
//!
//! Applications carry flag maps keyed by glob-style source patterns. For a
//! given source file the effective flags are those of the *first* pattern
//! that matches, in declaration order. This first-match rule is the only
//! flag-precedence rule in the system.

use glob::Pattern;

use crate::core::ConfigError;

/// An insertion-ordered list of (glob pattern, flag string) pairs.
#[derive(Debug, Clone, Default)]
pub struct PatternFlags {
    entries: Vec<(Pattern, String)>,
}

impl PatternFlags {
    pub fn new() -> Self {
        PatternFlags::default()
    }

    /// Build from (pattern, flags) pairs, preserving their order.
    ///
    /// `name` is the owning declaration, used for error reporting only.
    pub fn from_pairs<I>(name: &str, pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut entries = Vec::new();
        for (pattern, flags) in pairs {
            let compiled = Pattern::new(&pattern).map_err(|e| ConfigError::BadPattern {
                name: name.to_string(),
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            entries.push((compiled, flags));
        }
        Ok(PatternFlags { entries })
    }

    /// Resolve the effective flags for one source file.
    ///
    /// Returns the flags of the first matching pattern in declaration
    /// order, or the empty string when nothing matches. Patterns are
    /// matched fnmatch-style against the source path as declared (`*` may
    /// cross directory separators).
    pub fn resolve(&self, source: &str) -> &str {
        self.entries
            .iter()
            .find(|(pattern, _)| pattern.matches(source))
            .map(|(_, flags)| flags.as_str())
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(pairs: &[(&str, &str)]) -> PatternFlags {
        PatternFlags::from_pairs(
            "test",
            pairs
                .iter()
                .map(|(p, f)| (p.to_string(), f.to_string())),
        )
        .unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        // Declaration order decides, even when a later pattern is more
        // specific.
        let map = flags(&[("*.c", "-O2"), ("foo.c", "-O0")]);
        assert_eq!(map.resolve("foo.c"), "-O2");
    }

    #[test]
    fn test_later_entry_used_when_earlier_misses() {
        let map = flags(&[("bar.c", "-O0"), ("*.c", "-O2")]);
        assert_eq!(map.resolve("foo.c"), "-O2");
        assert_eq!(map.resolve("bar.c"), "-O0");
    }

    #[test]
    fn test_no_match_is_empty() {
        let map = flags(&[("*.cpp", "-std=c++17")]);
        assert_eq!(map.resolve("main.c"), "");
    }

    #[test]
    fn test_star_crosses_directories() {
        let map = flags(&[("*.c", "-Wall")]);
        assert_eq!(map.resolve("src/net/tcp.c"), "-Wall");
    }

    #[test]
    fn test_bad_pattern_is_config_error() {
        let err = PatternFlags::from_pairs(
            "app",
            vec![("[".to_string(), "-O2".to_string())],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::BadPattern { .. }));
    }
}
