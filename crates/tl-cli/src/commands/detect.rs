//! Detect command for reporting which parsers claim each file.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use tl_core::{Artifact, Registry};

use super::util;

/// Prints one line per file. Unreadable files are reported inline and do not
/// stop the remaining ones.
pub fn run<W: Write>(writer: &mut W, registry: &Registry, paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        match util::claimants(registry, path) {
            Ok(claimed) if claimed.is_empty() => {
                writeln!(writer, "{}: unclaimed", path.display())?;
            }
            Ok(claimed) => {
                let names: Vec<_> = claimed.iter().map(Artifact::name).collect();
                writeln!(writer, "{}: {}", path.display(), names.join(", "))?;
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), "detection failed: {err:#}");
                writeln!(writer, "{}: error: {err:#}", path.display())?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    use insta::assert_snapshot;

    #[test]
    fn reports_each_file() {
        let temp = tempfile::tempdir().unwrap();
        let zsh = temp.path().join(".zsh_history");
        fs::write(&zsh, ": 1673:42;ls -la\n").unwrap();
        let vsftpd = temp.path().join("vsftpd.log");
        fs::write(
            &vsftpd,
            "Mon Jun  6 18:43:28 2016 [pid 3] CONNECT: Client \"192.168.1.10\"\n",
        )
        .unwrap();
        let notes = temp.path().join("notes.txt");
        fs::write(&notes, "shopping list\n").unwrap();
        let cookies = temp.path().join("Cookies");
        rusqlite::Connection::open(&cookies)
            .unwrap()
            .execute_batch(
                "CREATE TABLE meta(key LONGVARCHAR NOT NULL UNIQUE PRIMARY KEY, value LONGVARCHAR);
                 CREATE TABLE cookies(creation_utc INTEGER NOT NULL, host_key TEXT NOT NULL,
                     name TEXT NOT NULL, value TEXT NOT NULL, path TEXT NOT NULL,
                     expires_utc INTEGER NOT NULL, is_secure INTEGER NOT NULL,
                     is_httponly INTEGER NOT NULL, last_access_utc INTEGER NOT NULL,
                     has_expires INTEGER NOT NULL DEFAULT 1, is_persistent INTEGER NOT NULL DEFAULT 1);",
            )
            .unwrap();
        let missing = temp.path().join("gone.log");

        let mut output = Vec::new();
        run(
            &mut output,
            &Registry::builtin().unwrap(),
            &[zsh, vsftpd, notes, cookies, missing],
        )
        .unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&temp.path().display().to_string(), "[TEMP]");
        assert_snapshot!(output, @r"
        [TEMP]/.zsh_history: zsh_extended_history
        [TEMP]/vsftpd.log: vsftpd
        [TEMP]/notes.txt: unclaimed
        [TEMP]/Cookies: chrome_66_cookies
        [TEMP]/gone.log: error: failed to read [TEMP]/gone.log: No such file or directory (os error 2)
        ");
    }
}
