use std::path::{Path, PathBuf};

pub const CONTEXT_DIR_NAME: &str = ".codemem";
pub const VECTORS_DIR_NAME: &str = "vectors";
pub const CORPUS_DIR_NAME: &str = "corpus";
pub const MEMORY_FILE_NAME: &str = "memory.json";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Overrides the state directory. Relative values resolve against the project root.
pub const CONTEXT_DIR_ENV: &str = "CODEMEM_DIR";

#[must_use]
pub fn context_dir_for_project_root(root: &Path) -> PathBuf {
    match std::env::var(CONTEXT_DIR_ENV) {
        Ok(raw) if !raw.trim().is_empty() => {
            let dir = PathBuf::from(raw.trim());
            if dir.is_absolute() {
                dir
            } else {
                root.join(dir)
            }
        }
        _ => root.join(CONTEXT_DIR_NAME),
    }
}

/// Snapshot file for the store called `name`.
#[must_use]
pub fn store_path_for_project_root(root: &Path, name: &str) -> PathBuf {
    context_dir_for_project_root(root)
        .join(VECTORS_DIR_NAME)
        .join(format!("{}.json", safe_component(name)))
}

/// Corpus statistics saved alongside the snapshot of the store called `name`.
#[must_use]
pub fn corpus_path_for_project_root(root: &Path, name: &str) -> PathBuf {
    context_dir_for_project_root(root)
        .join(VECTORS_DIR_NAME)
        .join(CORPUS_DIR_NAME)
        .join(format!("{}.json", safe_component(name)))
}

#[must_use]
pub fn memory_path_for_project_root(root: &Path) -> PathBuf {
    context_dir_for_project_root(root).join(MEMORY_FILE_NAME)
}

#[must_use]
pub fn config_path_for_project_root(root: &Path) -> PathBuf {
    context_dir_for_project_root(root).join(CONFIG_FILE_NAME)
}

fn safe_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() || out.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_names_cannot_escape_vectors_dir() {
        let root = Path::new("/work");
        let path = store_path_for_project_root(root, "../../etc/passwd");
        assert!(path.starts_with(context_dir_for_project_root(root).join(VECTORS_DIR_NAME)));
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(".._.._etc_passwd.json")
        );

        let corpus = corpus_path_for_project_root(root, "../../etc/passwd");
        assert!(corpus.starts_with(
            context_dir_for_project_root(root)
                .join(VECTORS_DIR_NAME)
                .join(CORPUS_DIR_NAME)
        ));
        assert_ne!(corpus, store_path_for_project_root(root, "corpus"));
        assert_eq!(safe_component(".."), "_");
        assert_eq!(safe_component(""), "_");
        assert_eq!(safe_component("workspace-1"), "workspace-1");
    }
}
