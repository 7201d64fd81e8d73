use crate::Result;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Builds a matcher for a list of glob patterns. An empty list matches
/// nothing.
pub fn build_set(globs: &[String]) -> Result<GlobSet> {
    let mut gb = GlobSetBuilder::new();
    for g in globs {
        let glob = GlobBuilder::new(g).empty_alternates(true).build()?;
        gb.add(glob);
    }
    Ok(gb.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn set(globs: &[&str]) -> GlobSet {
        let globs: Vec<String> = globs.iter().map(|s| s.to_string()).collect();
        build_set(&globs).unwrap()
    }

    #[test]
    fn test_extension_glob_matches_nested_paths() {
        let gs = set(&["*.rs"]);
        assert!(gs.is_match(Path::new("src/a.rs")));
        assert!(!gs.is_match(Path::new("src/b.py")));
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let gs = set(&[]);
        assert!(!gs.is_match(Path::new("src/a.rs")));
    }

    #[test]
    fn test_directory_glob() {
        let gs = set(&["vendor/**"]);
        assert!(gs.is_match(Path::new("vendor/lib.js")));
        assert!(!gs.is_match(Path::new("src/app.js")));
    }

    #[test]
    fn test_alternates() {
        let gs = set(&["*.{yml,yaml}"]);
        assert!(gs.is_match(Path::new("ci.yml")));
        assert!(gs.is_match(Path::new("ci.yaml")));
    }
}
