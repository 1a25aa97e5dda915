use std::time::{SystemTime, UNIX_EPOCH};

/// Types addressable by their derived identifier.
pub trait Id {
    fn id(&self) -> &str;

    fn has_id(&self, id: &str) -> bool {
        self.id() == id
    }
}

/// Computes the stable, identifier-safe string used as the join key wherever
/// records are referenced without holding a direct reference (URL parameters,
/// persisted selections, nav links).
///
/// Prefers the display name, falls back to the version label.  Runs of
/// non-alphanumeric characters collapse into a single `_`, and a leading
/// digit gets a `v` prefix so the result stays usable as a structural
/// identifier.
pub fn derived_id(name: Option<&str>, version_label: Option<&str>) -> String {
    let source = match (non_empty(name), non_empty(version_label)) {
        (Some(name), _) => name.to_string(),
        (None, Some(label)) => label.to_string(),
        // Pathological: nothing to derive from.  A timestamp placeholder is
        // the only case where the id is not deterministic.
        (None, None) => {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default();
            format!("update_{millis}")
        }
    };
    let mut id = String::with_capacity(source.len());
    for c in source.chars() {
        if c.is_ascii_alphanumeric() {
            id.push(c);
        } else if !id.ends_with('_') {
            id.push('_');
        }
    }
    let id = id.trim_matches('_');
    if id.starts_with(|c: char| c.is_ascii_digit()) {
        format!("v{id}")
    } else {
        id.to_string()
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
