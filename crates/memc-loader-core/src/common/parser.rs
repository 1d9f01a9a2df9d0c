//! Parser for `apps-installed` TSV lines.
//!
//! Each line carries five tab-separated fields:
//!
//! ```text
//! <dev_type>\t<dev_id>\t<lat>\t<lon>\t<app>,<app>,...
//! ```
//!
//! A line is rejected (returns `None`) when it has fewer than five fields,
//! either identifier is empty, or either coordinate is not a decimal float.
//! Individual app ids that are empty or not valid `u32` values are dropped
//! without rejecting the line. Fields past the fifth are ignored.

use crate::AppsInstalled;

/// Number of tab-separated fields in a well-formed line.
pub const FIELD_COUNT: usize = 5;

/// Parses one input line into an [`AppsInstalled`].
///
/// The caller is expected to have stripped the line terminator. Returns
/// `None` for a rejected line; the reason is logged at `warn` level for bad
/// coordinates and at `debug` level otherwise.
pub fn parse_apps_installed(line: &str) -> Option<AppsInstalled> {
    let mut parts = line.split('\t');
    let (Some(dev_type), Some(dev_id), Some(raw_lat), Some(raw_lon), Some(raw_apps)) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        tracing::debug!(line, "Rejected line with fewer than {FIELD_COUNT} fields");
        return None;
    };

    if dev_type.is_empty() || dev_id.is_empty() {
        tracing::debug!(line, "Rejected line with empty device type or id");
        return None;
    }

    let Ok(lat) = raw_lat.parse::<f64>() else {
        tracing::warn!(line, "Invalid lat");
        return None;
    };
    let Ok(lon) = raw_lon.parse::<f64>() else {
        tracing::warn!(line, "Invalid lon");
        return None;
    };

    Some(AppsInstalled {
        dev_type: dev_type.to_string(),
        dev_id: dev_id.to_string(),
        lat,
        lon,
        apps: parse_apps(raw_apps),
    })
}

fn parse_apps(raw: &str) -> Vec<u32> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match token.parse::<u32>() {
            Ok(app) => Some(app),
            Err(_) => {
                tracing::warn!(app = token, "Invalid app id");
                None
            }
        })
        .collect()
}
