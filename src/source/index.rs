//! Parser for Debian-style `Packages` repository indexes.
//!
//! An index is a sequence of stanzas separated by blank lines. Each stanza
//! is a list of `Field: value` lines; lines starting with whitespace continue
//! the previous field.
//!
//! ```text
//! Package: curl
//! Version: 8.5.0-2
//! Depends: libc6 (>= 2.34), libcurl4 (= 8.5.0-2), zlib1g (>= 1:1.1.4)
//!
//! Package: libcurl4
//! Pre-Depends: libc6
//! Depends: libssl3 | libssl1.1, zlib1g
//! ```

use std::collections::HashMap;

use super::{push_unique, SourceError, SourceResult};

/// Parses a `Packages` index into a package -> direct dependencies map.
///
/// `Pre-Depends` entries come first, then `Depends`. For alternatives the
/// first choice is taken; version constraints, architecture qualifiers and
/// build restrictions are stripped. When a package appears in several
/// stanzas the first stanza wins.
///
/// # Errors
///
/// Returns [`SourceError::Parse`] for a line that is neither a field nor a
/// continuation, a stanza without a `Package` field, or an index with no
/// packages at all.
///
/// # Example
///
/// ```
/// use depviz::source::parse_packages_index;
///
/// let index = "Package: curl\nDepends: libc6 (>= 2.34), libssl3 | libssl1.1\n";
/// let packages = parse_packages_index(index).unwrap();
/// assert_eq!(packages["curl"], vec!["libc6", "libssl3"]);
/// ```
pub fn parse_packages_index(content: &str) -> SourceResult<HashMap<String, Vec<String>>> {
    let mut packages = HashMap::new();
    let mut stanza = Stanza::default();

    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            stanza.finish(number, &mut packages)?;
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            stanza.continue_field(line.trim());
            continue;
        }

        let Some((field, value)) = line.split_once(':') else {
            return Err(SourceError::Parse(format!(
                "line {}: expected 'Field: value', found '{}'",
                number + 1,
                truncate(line)
            )));
        };
        stanza.start_field(field.trim(), value.trim());
    }
    stanza.finish(content.lines().count(), &mut packages)?;

    if packages.is_empty() {
        return Err(SourceError::Parse("index contains no packages".to_string()));
    }
    Ok(packages)
}

/// Field of interest currently being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    PreDepends,
    Depends,
    Other,
}

#[derive(Debug, Default)]
struct Stanza {
    package: Option<String>,
    pre_depends: String,
    depends: String,
    current: Option<Field>,
    has_fields: bool,
}

impl Stanza {
    fn start_field(&mut self, field: &str, value: &str) {
        self.has_fields = true;
        let kind = if field.eq_ignore_ascii_case("Package") {
            self.package = Some(value.to_string());
            Field::Other
        } else if field.eq_ignore_ascii_case("Pre-Depends") {
            self.pre_depends = value.to_string();
            Field::PreDepends
        } else if field.eq_ignore_ascii_case("Depends") {
            self.depends = value.to_string();
            Field::Depends
        } else {
            Field::Other
        };
        self.current = Some(kind);
    }

    fn continue_field(&mut self, value: &str) {
        let target = match self.current {
            Some(Field::PreDepends) => &mut self.pre_depends,
            Some(Field::Depends) => &mut self.depends,
            _ => return,
        };
        target.push(' ');
        target.push_str(value);
    }

    /// Stores the completed stanza and resets for the next one.
    fn finish(
        &mut self,
        line: usize,
        packages: &mut HashMap<String, Vec<String>>,
    ) -> SourceResult<()> {
        let stanza = std::mem::take(self);
        if !stanza.has_fields {
            return Ok(());
        }

        let Some(name) = stanza.package.filter(|name| !name.is_empty()) else {
            return Err(SourceError::Parse(format!(
                "stanza ending at line {line} has no Package field"
            )));
        };

        let mut deps = Vec::new();
        for relation in [stanza.pre_depends.as_str(), stanza.depends.as_str()] {
            for dep in parse_relations(relation) {
                push_unique(&mut deps, dep);
            }
        }
        packages.entry(name).or_insert(deps);
        Ok(())
    }
}

/// Extracts package names from a relationship field.
///
/// `libc6 (>= 2.34), python3:any, libssl3 | libssl1.1 [amd64]` yields
/// `libc6`, `python3`, `libssl3`.
fn parse_relations(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').filter_map(|clause| {
        let first = clause.split('|').next()?.trim();
        let name = first
            .split(|c: char| c.is_whitespace() || matches!(c, '(' | '[' | '<'))
            .next()?;
        let name = name.split(':').next()?;
        (!name.is_empty()).then_some(name)
    })
}

fn truncate(line: &str) -> String {
    const MAX: usize = 60;
    if line.chars().count() <= MAX {
        line.to_string()
    } else {
        format!("{}...", line.chars().take(MAX).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = "\
Package: curl
Version: 8.5.0-2
Depends: libc6 (>= 2.34), libcurl4 (= 8.5.0-2), zlib1g (>= 1:1.1.4)
Description: command line tool for transferring data with URL syntax
 curl is a command line tool for transferring data with URL syntax.

Package: libcurl4
Pre-Depends: libc6
Depends: libssl3 | libssl1.1, zlib1g,
 libnghttp2-14 (>= 1.50)

Package: libc6
Version: 2.36-9
";

    #[test]
    fn test_parse_index() {
        let packages = parse_packages_index(INDEX).unwrap();
        assert_eq!(packages.len(), 3);
        assert_eq!(packages["curl"], vec!["libc6", "libcurl4", "zlib1g"]);
        assert!(packages["libc6"].is_empty());
    }

    #[test]
    fn test_pre_depends_and_continuation_lines() {
        let packages = parse_packages_index(INDEX).unwrap();
        assert_eq!(
            packages["libcurl4"],
            vec!["libc6", "libssl3", "zlib1g", "libnghttp2-14"]
        );
    }

    #[test]
    fn test_strips_qualifiers_and_restrictions() {
        let index = "Package: tool\nDepends: python3:any, gcc [amd64], make <!nocheck>, perl(>= 5)\n";
        let packages = parse_packages_index(index).unwrap();
        assert_eq!(packages["tool"], vec!["python3", "gcc", "make", "perl"]);
    }

    #[test]
    fn test_duplicate_dependencies_dropped() {
        let index = "Package: a\nPre-Depends: b\nDepends: b (>= 1), c, c\n";
        let packages = parse_packages_index(index).unwrap();
        assert_eq!(packages["a"], vec!["b", "c"]);
    }

    #[test]
    fn test_first_stanza_wins() {
        let index = "Package: a\nDepends: b\n\nPackage: a\nDepends: c\n";
        let packages = parse_packages_index(index).unwrap();
        assert_eq!(packages["a"], vec!["b"]);
    }

    #[test]
    fn test_rejects_non_index_content() {
        let err = parse_packages_index("<!DOCTYPE html>\n<html></html>\n").unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_rejects_stanza_without_package() {
        let err = parse_packages_index("Version: 1.0\nDepends: a\n").unwrap_err();
        assert!(err.to_string().contains("no Package field"));
    }

    #[test]
    fn test_rejects_empty_index() {
        assert!(parse_packages_index("\n\n").is_err());
    }
}
