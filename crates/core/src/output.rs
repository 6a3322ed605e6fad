use std::{
    fs, io,
    path::{Path, PathBuf},
};

pub const DEFAULT_OUTPUT_PATH: &str = "graph.py";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The code was written, replacing any previous contents.
    Written(PathBuf),
    /// There was no code; the target was left untouched.
    NoCode,
}

/// Writes `code` to `path`, overwriting it. Empty code writes nothing.
pub fn write_code(code: &str, path: &Path) -> io::Result<WriteOutcome> {
    if code.is_empty() {
        return Ok(WriteOutcome::NoCode);
    }
    fs::write(path, code)?;
    Ok(WriteOutcome::Written(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_overwrites_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.py");
        fs::write(&path, "old contents that are longer than the new ones").unwrap();

        let outcome = write_code("import matplotlib", &path).unwrap();

        assert_eq!(outcome, WriteOutcome::Written(path.clone()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "import matplotlib");
    }

    #[test]
    fn test_empty_code_leaves_file_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.py");

        assert_eq!(write_code("", &path).unwrap(), WriteOutcome::NoCode);
        assert!(!path.exists());
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("graph.py");
        assert!(write_code("x = 1", &path).is_err());
    }
}
