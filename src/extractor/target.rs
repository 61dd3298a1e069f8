use crate::{Error, ErrorContext, Result};
use std::path::Path;
use url::Url;

/// Turn a configured target into a URL.
///
/// Anything containing `://` is taken as a URL; everything else is a local
/// path that must exist and is canonicalised into a `file://` URL.
pub fn resolve_target(target: &str) -> Result<Url> {
    let target = target.trim();
    if target.contains("://") {
        return Url::parse(target).map_err(|e| {
            Error::configuration_with_context(
                "invalid target URL",
                ErrorContext::new()
                    .with_field_path("target")
                    .with_details(format!("{}: {}", target, e))
                    .with_source("target_resolver"),
            )
        });
    }

    let canonical = Path::new(target).canonicalize().map_err(|e| {
        Error::configuration_with_context(
            "target file not found",
            ErrorContext::new()
                .with_field_path("target")
                .with_details(format!("{}: {}", target, e))
                .with_source("target_resolver"),
        )
    })?;

    Url::from_file_path(&canonical).map_err(|_| {
        Error::configuration_with_context(
            "target path cannot be expressed as a file URL",
            ErrorContext::new()
                .with_field_path("target")
                .with_details(canonical.display().to_string())
                .with_source("target_resolver"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_passes_through() {
        let url = resolve_target(" https://quotes.example.com/snapshot.json ").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.path(), "/snapshot.json");
    }

    #[test]
    fn test_existing_path_becomes_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("trading.json");
        std::fs::write(&file, "[]").unwrap();

        let url = resolve_target(file.to_str().unwrap()).unwrap();
        assert_eq!(url.scheme(), "file");
        assert_eq!(
            url.to_file_path().unwrap(),
            file.canonicalize().unwrap()
        );
    }

    #[test]
    fn test_missing_path_is_configuration_error() {
        let err = resolve_target("/definitely/not/here/trading.json").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("target")
        );
    }

    #[test]
    fn test_malformed_url_rejected() {
        assert!(resolve_target("http://[::1").is_err());
    }
}
