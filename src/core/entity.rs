//! Build-graph entity types.
//!
//! Four kinds of node exist: variables, static libraries, applications and
//! custom targets. Entities are immutable once constructed; everything the
//! emitters need is captured at registration time.

use crate::core::flags::PatternFlags;

/// Discriminant for [`Entity`], used for ordered per-kind queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Variable,
    Library,
    Application,
    Target,
}

/// One node in the build graph.
#[derive(Debug, Clone)]
pub enum Entity {
    Variable(Variable),
    Library(Library),
    Application(Application),
    Target(Target),
}

impl Entity {
    /// Unique name, also the primary emission key.
    pub fn name(&self) -> &str {
        match self {
            Entity::Variable(v) => &v.name,
            Entity::Library(l) => &l.name,
            Entity::Application(a) => &a.name,
            Entity::Target(t) => &t.name,
        }
    }

    /// Free-text description, used for human-readable rule descriptions.
    pub fn desc(&self) -> &str {
        match self {
            Entity::Variable(v) => &v.desc,
            Entity::Library(l) => &l.desc,
            Entity::Application(a) => &a.desc,
            Entity::Target(t) => &t.desc,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Variable(_) => EntityKind::Variable,
            Entity::Library(_) => EntityKind::Library,
            Entity::Application(_) => EntityKind::Application,
            Entity::Target(_) => EntityKind::Target,
        }
    }
}

/// A top-level assignment, emitted in both backends.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub desc: String,
    pub value: String,
}

impl Variable {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        desc: impl Into<String>,
    ) -> Self {
        Variable {
            name: name.into(),
            desc: desc.into(),
            value: value.into(),
        }
    }
}

/// A static library: one archive built from the objects of all matched
/// sources.
#[derive(Debug, Clone)]
pub struct Library {
    pub name: String,
    pub desc: String,
    /// Glob patterns, expanded against the source tree at plan time.
    pub sources: Vec<String>,
    /// Header directories, relative to the source tree.
    pub header_dirs: Vec<String>,
    /// Flat per-language flag strings.
    pub cflags: String,
    pub cppflags: String,
    pub asmflags: String,
}

impl Library {
    /// Archive file name (`libfoo.a` for a library named `foo`).
    pub fn archive_name(&self) -> String {
        format!("lib{}.a", self.name)
    }
}

/// An application: one linked executable.
#[derive(Debug, Clone)]
pub struct Application {
    pub name: String,
    pub desc: String,
    /// Literal source paths, relative to the source tree.
    pub sources: Vec<String>,
    /// Per-language pattern flag maps, resolved per source by first match.
    pub cflags: PatternFlags,
    pub cppflags: PatternFlags,
    pub asmflags: PatternFlags,
    pub linkflags: String,
    /// Names of registered libraries to link against.
    pub libs: Vec<String>,
}

/// A generic rule with no compiled artifact.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub desc: String,
    /// Command template; `$(NAME)` placeholders are substituted with
    /// registered variable values before emission.
    pub command: String,
    pub deps: Vec<String>,
}

impl Target {
    pub fn new(
        name: impl Into<String>,
        desc: impl Into<String>,
        command: impl Into<String>,
        deps: Vec<String>,
    ) -> Self {
        Target {
            name: name.into(),
            desc: desc.into(),
            command: command.into(),
            deps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_accessors() {
        let e = Entity::Variable(Variable::new("SRC_PATH", "/src", "source code path"));
        assert_eq!(e.name(), "SRC_PATH");
        assert_eq!(e.desc(), "source code path");
        assert_eq!(e.kind(), EntityKind::Variable);
    }

    #[test]
    fn test_archive_name() {
        let lib = Library {
            name: "m".to_string(),
            desc: String::new(),
            sources: vec![],
            header_dirs: vec![],
            cflags: String::new(),
            cppflags: String::new(),
            asmflags: String::new(),
        };
        assert_eq!(lib.archive_name(), "libm.a");
    }
}
