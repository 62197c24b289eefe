//! Import path resolution between the input and output files.

use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    out
}

/// Relative path from directory `from` to `to`. Both paths must be absolute
/// or both relative to the same base.
pub fn relative(from: &Path, to: &Path) -> PathBuf {
    let from = normalize(from);
    let to = normalize(to);
    let from: Vec<_> = from.components().collect();
    let to: Vec<_> = to.components().collect();

    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for component in &to[common..] {
        out.push(component);
    }
    out
}

/// Module specifier the generated file uses to import from the input file:
/// the input path without its extension, relative to the output file's
/// directory, `/`-separated, and `./`-prefixed unless it already climbs out
/// with `../`.
pub fn types_import_path(input: &Path, output: &Path) -> String {
    let output_dir = output.parent().unwrap_or(Path::new(""));
    let target = input.with_extension("");
    let rel = relative(output_dir, &target);

    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let joined = parts.join("/");
    if joined.starts_with("../") {
        joined
    } else {
        format!("./{}", joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn test_same_directory() {
        assert_eq!(
            types_import_path(Path::new("/p/src/types.ts"), Path::new("/p/src/schema.ts")),
            "./types"
        );
    }

    #[test]
    fn test_input_in_subdirectory() {
        assert_eq!(
            types_import_path(
                Path::new("/p/src/lib/database.types.ts"),
                Path::new("/p/src/schemas.ts")
            ),
            "./lib/database.types"
        );
    }

    #[test]
    fn test_input_in_parent_directory() {
        assert_eq!(
            types_import_path(Path::new("/p/types.ts"), Path::new("/p/src/gen/schemas.ts")),
            "../../types"
        );
        assert_eq!(
            types_import_path(Path::new("/p/db/types.ts"), Path::new("/p/src/schemas.ts")),
            "../db/types"
        );
    }

    #[test]
    fn test_relative_paths_with_dots() {
        assert_eq!(
            types_import_path(Path::new("./types.ts"), Path::new("./out/../schema.ts")),
            "./types"
        );
    }
}
