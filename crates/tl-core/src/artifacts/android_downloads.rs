//! Android native downloads database (`downloads.db` of
//! `com.android.providers.downloads`).
//!
//! `status`, `destination` and `visibility` are Android `DownloadManager`
//! constants and are passed through as integers.

use crate::emit::{AttributeSpec, EmissionSchema};
use crate::registry::{ColumnKind, ColumnSpec, RequiredTable, RowArtifact, RowQuery};
use crate::time::TimeHints;

/// Columns of `downloads` that must be present.
pub const DOWNLOAD_COLUMNS: &[&str] = &[
    "_id",
    "uri",
    "_data",
    "mimetype",
    "destination",
    "visibility",
    "status",
    "lastmod",
    "notificationpackage",
    "total_bytes",
    "current_bytes",
    "etag",
    "title",
    "description",
    "is_visible_in_downloads_ui",
    "mediaprovider_uri",
    "deleted",
    "errorMsg",
];

const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("_id", "id", ColumnKind::Int),
    ColumnSpec::new("uri", "uri", ColumnKind::Text),
    ColumnSpec::new("_data", "saved_to", ColumnKind::Text),
    ColumnSpec::new("mimetype", "mimetype", ColumnKind::Text),
    ColumnSpec::new("destination", "destination", ColumnKind::Int),
    ColumnSpec::new("visibility", "ui_visibility", ColumnKind::Int),
    ColumnSpec::new("status", "status", ColumnKind::Int),
    ColumnSpec::new("lastmod", "lastmod", ColumnKind::JavaTime),
    ColumnSpec::new("notificationpackage", "notification_package", ColumnKind::Text),
    ColumnSpec::new("total_bytes", "total_bytes", ColumnKind::Int),
    ColumnSpec::new("current_bytes", "current_bytes", ColumnKind::Int),
    ColumnSpec::new("etag", "e_tag", ColumnKind::Text),
    ColumnSpec::new("title", "title", ColumnKind::Text),
    ColumnSpec::new("description", "description", ColumnKind::Text),
    ColumnSpec::new(
        "is_visible_in_downloads_ui",
        "is_visible_in_downloads_ui",
        ColumnKind::Bool,
    ),
    ColumnSpec::new("mediaprovider_uri", "media_provider_uri", ColumnKind::Text),
    ColumnSpec::new("deleted", "deleted", ColumnKind::Bool),
    ColumnSpec::new("errorMsg", "error_msg", ColumnKind::Text),
];

pub static ANDROID_NATIVE_DOWNLOADS: RowArtifact = RowArtifact {
    name: "android_native_downloads",
    description: "Android native downloads SQLite database",
    required: &[RequiredTable {
        name: "downloads",
        columns: DOWNLOAD_COLUMNS,
    }],
    queries: &[RowQuery {
        sql: "SELECT _id, uri, _data, mimetype, destination, visibility, status, lastmod, \
              notificationpackage, total_bytes, current_bytes, etag, title, description, \
              is_visible_in_downloads_ui, mediaprovider_uri, deleted, errorMsg FROM downloads",
        columns: COLUMNS,
        finish: None,
        derived: &[],
    }],
    emission: EmissionSchema {
        data_type: "android:sqlite:downloads",
        attributes: &[
            AttributeSpec::same("id"),
            AttributeSpec::same("uri"),
            AttributeSpec::same("saved_to"),
            AttributeSpec::same("mimetype"),
            AttributeSpec::same("destination"),
            AttributeSpec::same("ui_visibility"),
            AttributeSpec::same("status"),
            AttributeSpec::same("lastmod"),
            AttributeSpec::same("notification_package"),
            AttributeSpec::same("total_bytes"),
            AttributeSpec::same("current_bytes"),
            AttributeSpec::same("e_tag"),
            AttributeSpec::same("title"),
            AttributeSpec::same("description"),
            AttributeSpec::same("is_visible_in_downloads_ui"),
            AttributeSpec::same("media_provider_uri"),
            AttributeSpec::same("deleted"),
            AttributeSpec::same("error_msg"),
        ],
    },
    hints: TimeHints::DEFAULT,
};
