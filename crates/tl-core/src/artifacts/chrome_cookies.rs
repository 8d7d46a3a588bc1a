//! Google Chrome `Cookies` databases.
//!
//! Chrome 17 through 65 name the flag columns `secure`, `httponly` and
//! `persistent`; Chrome 66 and later prefix them with `is_`. Both layouts
//! produce the same event.

use crate::emit::{AttributeSpec, EmissionSchema};
use crate::record::ExtractedRecord;
use crate::registry::{ColumnKind, ColumnSpec, RequiredTable, RowArtifact, RowQuery};
use crate::time::TimeHints;

pub const CHROME_17_COLUMNS: &[&str] = &[
    "creation_utc",
    "host_key",
    "name",
    "value",
    "path",
    "expires_utc",
    "secure",
    "httponly",
    "last_access_utc",
    "has_expires",
    "persistent",
];

pub const CHROME_66_COLUMNS: &[&str] = &[
    "creation_utc",
    "host_key",
    "name",
    "value",
    "path",
    "expires_utc",
    "is_secure",
    "is_httponly",
    "last_access_utc",
    "has_expires",
    "is_persistent",
];

/// Result-set columns; the Chrome 66 query aliases its flag columns to these.
const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("creation_utc", "creation_time", ColumnKind::WebKitTime),
    ColumnSpec::new("host_key", "host", ColumnKind::Text),
    ColumnSpec::new("name", "cookie_name", ColumnKind::Text),
    ColumnSpec::new("value", "data", ColumnKind::Text),
    ColumnSpec::new("path", "path", ColumnKind::Text),
    ColumnSpec::new("expires_utc", "expiration_time", ColumnKind::WebKitTime),
    ColumnSpec::new("secure", "secure", ColumnKind::Bool),
    ColumnSpec::new("httponly", "httponly", ColumnKind::Bool),
    ColumnSpec::new("last_access_utc", "last_access_time", ColumnKind::WebKitTime),
    ColumnSpec::new("persistent", "persistent", ColumnKind::Bool),
];

const EMISSION: EmissionSchema = EmissionSchema {
    data_type: "chrome:cookie:entry",
    attributes: &[
        AttributeSpec::same("creation_time"),
        AttributeSpec::same("last_access_time"),
        AttributeSpec::same("expiration_time"),
        AttributeSpec::same("host"),
        AttributeSpec::same("cookie_name"),
        AttributeSpec::same("data"),
        AttributeSpec::same("path"),
        AttributeSpec::same("secure"),
        AttributeSpec::same("httponly"),
        AttributeSpec::same("persistent"),
        AttributeSpec::same("url"),
    ],
};

/// `http(s)://` + host without its leading dot + path.
fn derive_url(record: &mut ExtractedRecord) {
    let Some(host) = record.get_str("host") else {
        return;
    };
    let host = host.trim_start_matches('.').to_string();
    let path = record.get_str("path").unwrap_or_default().to_string();
    let scheme = if record.get_bool("secure") == Some(true) {
        "https"
    } else {
        "http"
    };
    record.insert("url", format!("{scheme}://{host}{path}"));
}

pub static CHROME_17_COOKIES: RowArtifact = RowArtifact {
    name: "chrome_17_cookies",
    description: "Google Chrome 17 - 65 cookies SQLite database",
    required: &[
        RequiredTable {
            name: "cookies",
            columns: CHROME_17_COLUMNS,
        },
        RequiredTable {
            name: "meta",
            columns: &[],
        },
    ],
    queries: &[RowQuery {
        sql: "SELECT creation_utc, host_key, name, value, path, expires_utc, secure, httponly, \
              last_access_utc, has_expires, persistent FROM cookies",
        columns: COLUMNS,
        finish: Some(derive_url),
        derived: &["url"],
    }],
    emission: EMISSION,
    hints: TimeHints::DEFAULT,
};

pub static CHROME_66_COOKIES: RowArtifact = RowArtifact {
    name: "chrome_66_cookies",
    description: "Google Chrome 66 and later cookies SQLite database",
    required: &[
        RequiredTable {
            name: "cookies",
            columns: CHROME_66_COLUMNS,
        },
        RequiredTable {
            name: "meta",
            columns: &[],
        },
    ],
    queries: &[RowQuery {
        sql: "SELECT creation_utc, host_key, name, value, path, expires_utc, is_secure AS secure, \
              is_httponly AS httponly, last_access_utc, has_expires, is_persistent AS persistent \
              FROM cookies",
        columns: COLUMNS,
        finish: Some(derive_url),
        derived: &["url"],
    }],
    emission: EMISSION,
    hints: TimeHints::DEFAULT,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_strips_leading_dot_and_honours_secure() {
        let mut record = ExtractedRecord::new();
        record.insert("host", ".example.com");
        record.insert("path", "/login");
        record.insert("secure", false);
        derive_url(&mut record);
        assert_eq!(record.get_str("url"), Some("http://example.com/login"));

        record.insert("secure", true);
        derive_url(&mut record);
        assert_eq!(record.get_str("url"), Some("https://example.com/login"));
    }

    #[test]
    fn url_needs_a_host() {
        let mut record = ExtractedRecord::new();
        record.insert("path", "/");
        derive_url(&mut record);
        assert!(!record.contains("url"));
    }
}
