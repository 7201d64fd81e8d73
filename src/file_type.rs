//! File classification into type tags.
//!
//! Hooks select files by type tags like `"python"` or `"yaml"` rather than by
//! raw extensions, so one hook definition covers `*.yml` and `*.yaml` alike.
//! Tags are derived from the filename, the extension, and (for extensionless
//! executables) the shebang line.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Returns all type tags for a path, e.g. `{"text", "python"}`.
pub fn tags_for_path(path: &Path) -> HashSet<String> {
    let mut tags = HashSet::new();

    if let Some(filename) = path.file_name().and_then(|n| n.to_str())
        && let Some(name_tags) = tags_by_filename(filename)
    {
        tags.extend(name_tags.iter().map(|t| t.to_string()));
    }

    if let Some(ext) = path.extension().and_then(|e| e.to_str())
        && let Some(ext_tags) = tags_by_extension(&ext.to_lowercase())
    {
        tags.extend(ext_tags.iter().map(|t| t.to_string()));
    }

    if tags.is_empty()
        && let Some(shebang_tags) = tags_by_shebang(path)
    {
        tags.extend(shebang_tags.iter().map(|t| t.to_string()));
    }

    if tags.is_empty() {
        tags.insert("text".to_string());
    }
    tags
}

fn tags_by_extension(ext: &str) -> Option<&'static [&'static str]> {
    let tags: &[&str] = match ext {
        "rs" => &["text", "rust"],
        "py" | "pyi" => &["text", "python"],
        "js" | "mjs" | "cjs" => &["text", "javascript"],
        "jsx" => &["text", "javascript", "jsx"],
        "ts" | "mts" | "cts" => &["text", "typescript"],
        "tsx" => &["text", "typescript", "tsx"],
        "go" => &["text", "go"],
        "rb" => &["text", "ruby"],
        "sh" | "bash" => &["text", "shell"],
        "zsh" => &["text", "shell", "zsh"],
        "fish" => &["text", "shell", "fish"],
        "c" | "h" => &["text", "c"],
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => &["text", "c++"],
        "java" => &["text", "java"],
        "kt" | "kts" => &["text", "kotlin"],
        "swift" => &["text", "swift"],
        "toml" => &["text", "toml"],
        "yaml" | "yml" => &["text", "yaml"],
        "json" => &["text", "json"],
        "md" | "markdown" => &["text", "markdown"],
        "html" | "htm" => &["text", "html"],
        "css" => &["text", "css"],
        "scss" | "sass" => &["text", "css", "scss"],
        "sql" => &["text", "sql"],
        "proto" => &["text", "protobuf"],
        "tf" | "tfvars" => &["text", "terraform"],
        "lua" => &["text", "lua"],
        "pl" | "pm" => &["text", "perl"],
        "xml" => &["text", "xml"],
        "txt" => &["text", "plain-text"],
        "ini" | "cfg" => &["text", "ini"],
        "png" => &["binary", "image", "png"],
        "jpg" | "jpeg" => &["binary", "image", "jpeg"],
        "gif" => &["binary", "image", "gif"],
        "pdf" => &["binary", "pdf"],
        "zip" => &["binary", "zip"],
        "gz" | "tgz" => &["binary", "gzip"],
        _ => return None,
    };
    Some(tags)
}

fn tags_by_filename(filename: &str) -> Option<&'static [&'static str]> {
    let tags: &[&str] = match filename {
        "Dockerfile" => &["text", "dockerfile"],
        "Makefile" | "makefile" | "GNUmakefile" => &["text", "makefile"],
        "Cargo.lock" => &["text", "toml", "lockfile"],
        "Gemfile" => &["text", "ruby"],
        "Rakefile" => &["text", "ruby"],
        "BUILD" | "BUILD.bazel" | "WORKSPACE" => &["text", "bazel"],
        ".gitignore" | ".gitattributes" => &["text", "gitconfig"],
        _ => {
            if filename.starts_with("Dockerfile.") {
                &["text", "dockerfile"]
            } else {
                return None;
            }
        }
    };
    Some(tags)
}

fn tags_by_shebang(path: &Path) -> Option<&'static [&'static str]> {
    let file = File::open(path).ok()?;
    let mut first_line = String::new();
    BufReader::new(file).read_line(&mut first_line).ok()?;
    let line = first_line.strip_prefix("#!")?.trim();
    // `#!/usr/bin/env python3` and `#!/usr/bin/python3` both resolve to the
    // interpreter basename.
    let interpreter = line
        .split_whitespace()
        .find(|part| !part.ends_with("/env"))
        .map(|part| part.rsplit('/').next().unwrap_or(part))?;
    let interpreter = interpreter.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.');
    let tags: &[&str] = match interpreter {
        "python" => &["text", "python"],
        "node" => &["text", "javascript"],
        "ruby" => &["text", "ruby"],
        "sh" | "bash" | "dash" => &["text", "shell"],
        "zsh" => &["text", "shell", "zsh"],
        "perl" => &["text", "perl"],
        _ => return None,
    };
    Some(tags)
}
