//! Installed casks, as far as the reinstall command needs to know them

use crate::error::Result;
use std::fs;
use std::path::Path;

/// An installed cask: `Caskroom/<token>/<version>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cask {
    pub token: String,
    pub version: String,
}

/// Look up an installed cask by token
pub fn installed_cask(caskroom: &Path, token: &str) -> Option<Cask> {
    let dir = caskroom.join(token);
    if !dir.is_dir() {
        return None;
    }

    // The first (and typically only) version directory
    let entries = fs::read_dir(&dir).ok()?;
    for entry in entries.flatten() {
        if entry.path().is_dir()
            && let Some(version) = entry.file_name().to_str()
            && !version.starts_with('.')
        {
            return Some(Cask {
                token: token.to_string(),
                version: version.to_string(),
            });
        }
    }

    None
}

/// Tokens of all installed casks, sorted
pub fn installed_tokens(caskroom: &Path) -> Result<Vec<String>> {
    if !caskroom.exists() {
        return Ok(vec![]);
    }

    let mut tokens = Vec::new();
    for entry in fs::read_dir(caskroom)? {
        let entry = entry?;
        let token = entry.file_name().to_string_lossy().to_string();
        if !token.starts_with('.') && installed_cask(caskroom, &token).is_some() {
            tokens.push(token);
        }
    }

    tokens.sort();
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_installed_casks() {
        let temp = TempDir::new().unwrap();
        let caskroom = temp.path().join("Caskroom");
        fs::create_dir_all(caskroom.join("firefox/131.0")).unwrap();
        fs::create_dir_all(caskroom.join("empty")).unwrap();
        fs::create_dir_all(caskroom.join(".metadata")).unwrap();

        assert_eq!(
            installed_cask(&caskroom, "firefox"),
            Some(Cask {
                token: "firefox".to_string(),
                version: "131.0".to_string()
            })
        );
        assert_eq!(installed_cask(&caskroom, "empty"), None);
        assert_eq!(installed_cask(&caskroom, "missing"), None);
        assert_eq!(installed_tokens(&caskroom).unwrap(), vec!["firefox"]);
    }
}
