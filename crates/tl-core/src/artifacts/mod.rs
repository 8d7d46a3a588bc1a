//! Built-in artifact declarations. Data only; the engine does the work.

pub mod android_downloads;
pub mod chrome_cookies;
pub mod fish;
pub mod google_log;
pub mod mac_notes;
pub mod vsftpd;
pub mod zsh;

use crate::registry::Artifact;

/// Registration order is detection order.
pub static BUILTIN: [Artifact; 8] = [
    Artifact::Text(&zsh::ZSH_EXTENDED_HISTORY),
    Artifact::Text(&vsftpd::VSFTPD),
    Artifact::Text(&fish::FISH_HISTORY),
    Artifact::Text(&google_log::GOOGLE_LOG),
    Artifact::Rows(&android_downloads::ANDROID_NATIVE_DOWNLOADS),
    Artifact::Rows(&chrome_cookies::CHROME_17_COOKIES),
    Artifact::Rows(&chrome_cookies::CHROME_66_COOKIES),
    Artifact::Rows(&mac_notes::MAC_NOTES),
];
