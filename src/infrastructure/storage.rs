use std::fs;
use std::path::Path;

/// Create the directory that will hold `file`, if any.
pub fn ensure_parent_dir(file: &Path) -> std::io::Result<()> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_parent_dir_creates_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("outputs").join("nested").join("result.csv");

        ensure_parent_dir(&file).unwrap();
        assert!(file.parent().unwrap().is_dir());

        ensure_parent_dir(Path::new("result.csv")).unwrap();
    }
}
