//! Object store key layout
//!
//! - `<userId>/<epochMillis>-<sanitizedName>` - uploads
//! - `<trackId>/stems/<stem>.<ext>` - stems
//! - `<mashupId>.mp3` - final mixes
//! - `preview-<trackAId>-<trackBId>.mp3` - transition previews

use uuid::Uuid;

/// Strip a user-supplied file name down to a key-safe form
///
/// Keeps alphanumerics, dash, underscore and dot; everything else
/// becomes an underscore. Empty names become "upload".
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.').to_string();
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed
    }
}

/// Key for an uploaded source file
pub fn upload_key(user_id: &str, epoch_millis: i64, name: &str) -> String {
    format!("{}/{}-{}", user_id, epoch_millis, sanitize_name(name))
}

/// Key for one separated stem
pub fn stem_key(track_id: Uuid, stem: &str, ext: &str) -> String {
    format!("{}/stems/{}.{}", track_id, stem, ext)
}

/// Key for the final rendered mix
pub fn mashup_key(mashup_id: Uuid) -> String {
    format!("{}.mp3", mashup_id)
}

/// Key for a rendered transition preview
pub fn preview_key(track_a: Uuid, track_b: Uuid) -> String {
    format!("preview-{}-{}.mp3", track_a, track_b)
}
