//! Developer tools detection for `--build-from-source`.

use std::env;
use std::path::Path;
#[cfg(target_os = "macos")]
use std::process::Command;

const COMPILERS: [&str; 3] = ["cc", "clang", "gcc"];

/// Whether a C compiler is available for source builds
pub fn installed() -> bool {
    #[cfg(target_os = "macos")]
    {
        let xcode = Command::new("xcode-select")
            .arg("-p")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false);
        if !xcode {
            return false;
        }
    }

    env::var_os("PATH")
        .map(|path| compiler_in(&path))
        .unwrap_or(false)
}

/// Whether any known compiler is an executable file on `path`
pub fn compiler_in(path: &std::ffi::OsStr) -> bool {
    env::split_paths(path).any(|dir| COMPILERS.iter().any(|cc| is_executable(&dir.join(cc))))
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

pub fn installation_instructions() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install the Command Line Tools with: xcode-select --install"
    } else {
        "Install a compiler, e.g. with your system package manager or: brew install gcc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_compiler_in_path() {
        let temp = TempDir::new().unwrap();
        let empty = temp.path().join("empty");
        let tools = temp.path().join("tools");
        fs::create_dir_all(&empty).unwrap();
        fs::create_dir_all(&tools).unwrap();

        let path = env::join_paths([&empty]).unwrap();
        assert!(!compiler_in(&path));

        let gcc = tools.join("gcc");
        fs::write(&gcc, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // not executable yet
            let path = env::join_paths([&empty, &tools]).unwrap();
            assert!(!compiler_in(&path));
            fs::set_permissions(&gcc, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let path = env::join_paths([&empty, &tools]).unwrap();
        assert!(compiler_in(&path));
    }
}
