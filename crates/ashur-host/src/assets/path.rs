use anyhow::{bail, Result};

/// Resolves an asset path against the configured asset root.
///
/// Absolute URLs (`http://`, `https://`, protocol-relative `//`) and `data:`
/// URIs pass through unchanged. Anything else is treated as relative to the
/// asset root, with leading slashes stripped first.
pub fn resolve_asset_path(path: &str, root: &str) -> Result<String> {
    if path.is_empty() {
        bail!("Asset path is empty");
    }
    if is_external(path) {
        return Ok(path.to_owned());
    }
    let trimmed = path.trim_start_matches('/');
    let root = root.trim_end_matches('/');
    Ok(format!("{root}/{trimmed}"))
}

fn is_external(path: &str) -> bool {
    path.starts_with("http://")
        || path.starts_with("https://")
        || path.starts_with("//")
        || path.starts_with("data:")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "./assets";

    #[test]
    fn relative_path_is_prefixed() {
        assert_eq!(
            resolve_asset_path("sprites/ship.png", ROOT).unwrap(),
            "./assets/sprites/ship.png"
        );
    }

    #[test]
    fn leading_slash_is_stripped() {
        assert_eq!(
            resolve_asset_path("/a/b.png", ROOT).unwrap(),
            "./assets/a/b.png"
        );
    }

    #[test]
    fn trailing_slash_on_root_is_tolerated() {
        assert_eq!(
            resolve_asset_path("a.png", "./assets/").unwrap(),
            "./assets/a.png"
        );
    }

    #[test]
    fn absolute_urls_pass_through() {
        assert_eq!(
            resolve_asset_path("https://example.com/a.png", ROOT).unwrap(),
            "https://example.com/a.png"
        );
        assert_eq!(
            resolve_asset_path("http://example.com/a.png", ROOT).unwrap(),
            "http://example.com/a.png"
        );
        assert_eq!(
            resolve_asset_path("//cdn.example.com/a.png", ROOT).unwrap(),
            "//cdn.example.com/a.png"
        );
    }

    #[test]
    fn data_uris_pass_through() {
        let uri = "data:image/png;base64,AAAA";
        assert_eq!(resolve_asset_path(uri, ROOT).unwrap(), uri);
    }

    #[test]
    fn empty_path_is_an_error() {
        let err = resolve_asset_path("", ROOT).unwrap_err();
        assert_eq!(err.to_string(), "Asset path is empty");
    }
}
