/// Length of the extension dropped from the last URI segment, dot included.
const EXTENSION_LEN: usize = 4;

/// Reasons a URI cannot be turned into a local archive name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamingError {
    #[error("no 4-character extension on last segment of {uri}")]
    MissingExtension { uri: String },

    #[error("empty archive name derived from {uri}")]
    EmptyName { uri: String },

    #[error("archive name derived from {uri} refers to a directory")]
    ReservedName { uri: String },
}

/// Derive the local archive name from a source URI.
///
/// Takes the last `/`-separated segment and drops its trailing extension,
/// which must be exactly a dot followed by three characters (`.zip`).
pub fn archive_name(uri: &str) -> Result<String, NamingError> {
    let segment = uri.rsplit('/').next().unwrap_or(uri);

    let chars: Vec<char> = segment.chars().collect();
    if chars.len() < EXTENSION_LEN || chars[chars.len() - EXTENSION_LEN] != '.' {
        return Err(NamingError::MissingExtension {
            uri: uri.to_owned(),
        });
    }

    let stem: String = chars[..chars.len() - EXTENSION_LEN].iter().collect();
    if stem.is_empty() {
        return Err(NamingError::EmptyName {
            uri: uri.to_owned(),
        });
    }

    if stem == "." || stem == ".." {
        return Err(NamingError::ReservedName {
            uri: uri.to_owned(),
        });
    }

    Ok(stem)
}
