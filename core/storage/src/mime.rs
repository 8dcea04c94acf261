//! Content-type lookup by file extension.

/// Extract the extension of a file name (text after the last `.`).
fn extension(file_name: &str) -> Option<&str> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

/// Check whether a file name carries an extension at all.
pub fn has_extension(file_name: &str) -> bool {
    extension(file_name).is_some()
}

/// Resolve a file name to its MIME type.
///
/// Returns `None` for an empty name, a name without an extension, or an
/// extension `mime_guess` does not know. Matching ignores ASCII case.
pub fn resolve(file_name: &str) -> Option<&'static str> {
    let ext = extension(file_name)?;
    mime_guess::from_ext(ext).first_raw()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_resolve_known_extensions() {
        assert_eq!(resolve("photo.png"), Some("image/png"));
        assert_eq!(resolve("talk.mp3"), Some("audio/mpeg"));
        assert_eq!(resolve("clip.mp4"), Some("video/mp4"));
        assert_eq!(resolve("paper.pdf"), Some("application/pdf"));
    }

    #[test]
    fn test_resolve_less_common_media() {
        assert!(resolve("scan.jpe").is_some_and(|t| t.starts_with("image/")));
        assert!(resolve("clip.qt").is_some_and(|t| t.starts_with("video/")));
        assert!(resolve("track.mp2").is_some_and(|t| t.starts_with("audio/")));
        assert!(resolve("voice.mpga").is_some_and(|t| t.starts_with("audio/")));
    }

    #[test]
    fn test_resolve_uses_last_dot() {
        assert!(resolve("archive.tar.gz").is_some_and(|t| t.ends_with("gzip")));
        assert_eq!(resolve("my.photo.jpeg"), Some("image/jpeg"));
    }

    #[test]
    fn test_resolve_ignores_case() {
        assert_eq!(resolve("IMG_0001.JPG"), Some("image/jpeg"));
        assert_eq!(resolve("PHOTO.PNG"), Some("image/png"));
    }

    #[test]
    fn test_resolve_unresolvable() {
        assert_eq!(resolve(""), None);
        assert_eq!(resolve("README"), None);
        assert_eq!(resolve("trailing."), None);
        assert_eq!(resolve("notes.xyz"), None);
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension("notes.xyz"));
        assert!(!has_extension("Makefile"));
        assert!(!has_extension("trailing."));
    }

    proptest! {
        #[test]
        fn test_resolve_is_idempotent(name in "\\PC{0,24}") {
            prop_assert_eq!(resolve(&name), resolve(&name));
        }
    }
}
