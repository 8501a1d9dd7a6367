//! Source tree discovery

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::IndexError;

/// Directories and Java files found under a root, in walk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceWalk {
    pub directories: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
}

/// Walks a project root honouring hidden-file rules, `.gitignore` and
/// configured exclude globs (matched against root-relative paths).
#[derive(Debug, Clone)]
pub struct SourceWalker {
    root: PathBuf,
    exclude: GlobSet,
}

fn is_excluded(exclude: &GlobSet, root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    !relative.as_os_str().is_empty() && exclude.is_match(relative)
}

impl SourceWalker {
    pub fn new(root: impl Into<PathBuf>, patterns: &[String]) -> Result<Self, IndexError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self {
            root: root.into(),
            exclude: builder.build()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn walk(&self) -> SourceWalk {
        let exclude = self.exclude.clone();
        let root = self.root.clone();
        let walker = ignore::WalkBuilder::new(&self.root)
            .standard_filters(true)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| !is_excluded(&exclude, &root, entry.path()))
            .build();

        let mut walk = SourceWalk::default();
        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("Skipping unreadable entry: {err}");
                    continue;
                }
            };
            let path = entry.path();
            if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                walk.directories.push(path.to_path_buf());
            } else if path.extension().is_some_and(|ext| ext == "java") {
                walk.files.push(path.to_path_buf());
            }
        }
        tracing::debug!(
            "Walked {}: {} directories, {} Java files",
            self.root.display(),
            walk.directories.len(),
            walk.files.len()
        );
        walk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_java_sources_and_skips_ignored_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/app")).unwrap();
        fs::create_dir_all(root.join("build/gen")).unwrap();
        fs::create_dir_all(root.join("vendor")).unwrap();
        fs::write(root.join("src/app/Main.java"), "class Main {}").unwrap();
        fs::write(root.join("src/app/notes.txt"), "").unwrap();
        fs::write(root.join("build/gen/Gen.java"), "class Gen {}").unwrap();
        fs::write(root.join("vendor/Lib.java"), "class Lib {}").unwrap();
        fs::write(root.join(".gitignore"), "build/\n").unwrap();

        let walker = SourceWalker::new(root, &["vendor".to_string()]).unwrap();
        let walk = walker.walk();

        assert_eq!(walk.files, vec![root.join("src/app/Main.java")]);
        assert_eq!(
            walk.directories,
            vec![root.to_path_buf(), root.join("src"), root.join("src/app")]
        );
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        let err = SourceWalker::new("/tmp", &["[".to_string()]).unwrap_err();
        assert!(matches!(err, IndexError::Pattern(_)));
    }
}
