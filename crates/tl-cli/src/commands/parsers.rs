//! Parsers command for listing registered artifacts.

use std::io::Write;

use anyhow::Result;
use tl_core::Registry;

pub fn run<W: Write>(writer: &mut W, registry: &Registry) -> Result<()> {
    if registry.is_empty() {
        writeln!(writer, "No parsers enabled.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<25} {:<5} {:<25} DESCRIPTION",
        "NAME", "KIND", "DATA TYPE"
    )?;
    for artifact in registry.iter() {
        writeln!(
            writer,
            "{:<25} {:<5} {:<25} {}",
            artifact.name(),
            artifact.kind(),
            artifact.data_type(),
            artifact.description()
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    #[test]
    fn lists_builtin_parsers_in_detection_order() {
        let mut output = Vec::new();
        run(&mut output, &Registry::builtin().unwrap()).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        NAME                      KIND  DATA TYPE                 DESCRIPTION
        zsh_extended_history      text  shell:zsh:history         Zsh extended history file
        vsftpd                    text  vsftpd:log                vsftpd log file
        fish_history              text  fish:history:entry        Fish history file
        google_log                text  googlelog:log             Google logging (glog) text log
        android_native_downloads  rows  android:sqlite:downloads  Android native downloads SQLite database
        chrome_17_cookies         rows  chrome:cookie:entry       Google Chrome 17 - 65 cookies SQLite database
        chrome_66_cookies         rows  chrome:cookie:entry       Google Chrome 66 and later cookies SQLite database
        mac_notes                 rows  mac:notes:note            Mac Notes SQLite database
        ");
    }

    #[test]
    fn empty_registry() {
        let mut output = Vec::new();
        run(&mut output, &Registry::new(Vec::<tl_core::Artifact>::new()).unwrap()).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @"No parsers enabled.");
    }
}
