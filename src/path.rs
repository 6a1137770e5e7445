//! Path rules for the flat namespace: absolute, single segment, no embedded
//! NUL, capped at `NAME_LENGTH` bytes including the leading `/`.

use crate::config::NAME_LENGTH;
use crate::error::FsError;
use crate::Result;

/// Checks a path argument for a file operation. `/` itself is not a file.
pub fn validate(path: &str) -> Result<()> {
    if !path.starts_with('/') || path.len() < 2 {
        return Err(FsError::InvalidArgument);
    }
    if path.len() > NAME_LENGTH {
        return Err(FsError::InvalidArgument);
    }
    if path.as_bytes().contains(&0) {
        return Err(FsError::InvalidArgument);
    }
    if path[1..].contains('/') {
        return Err(FsError::InvalidArgument);
    }
    Ok(())
}

/// Name as listed by `readdir`: the stored path without its leading `/`.
pub fn display_name(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accepts_plain_files() {
        assert!(validate("/a").is_ok());
        assert!(validate("/some-long.file_name").is_ok());
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(validate("a").unwrap_err(), FsError::InvalidArgument);
        assert_eq!(validate("/").unwrap_err(), FsError::InvalidArgument);
        assert_eq!(validate("").unwrap_err(), FsError::InvalidArgument);
        assert_eq!(validate("/a\0b").unwrap_err(), FsError::InvalidArgument);
        assert_eq!(validate("/a/b").unwrap_err(), FsError::InvalidArgument);
    }

    #[test]
    fn rejects_over_cap() {
        let long = format!("/{}", "x".repeat(NAME_LENGTH));
        assert_eq!(validate(&long).unwrap_err(), FsError::InvalidArgument);
        let fits = format!("/{}", "x".repeat(NAME_LENGTH - 1));
        assert!(validate(&fits).is_ok());
    }

    #[test]
    fn display_strips_slash() {
        assert_eq!(display_name("/a.txt"), "a.txt");
    }
}
