use std::{fs, path::PathBuf};

use crate::error::FetchError;

const USER_AGENT: &str = "geo-flatten";

pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

pub fn download_source(url: &str) -> Result<Vec<u8>, FetchError> {
    let http_error = |source: reqwest::Error| FetchError::Http {
        url: url.to_string(),
        source,
    };
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(http_error)?;
    let response = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(http_error)?;
    let body = response.bytes().map_err(http_error)?;
    Ok(body.to_vec())
}

/// Raw bytes of `source`, downloaded when it is an HTTP(S) URL and read from disk otherwise.
pub fn fetch_source(source: &str) -> Result<Vec<u8>, FetchError> {
    if is_url(source) {
        log::info!("Downloading {}", source);
        return download_source(source);
    }
    log::info!("Reading {}", source);
    fs::read(source).map_err(|source_err| FetchError::Io {
        path: PathBuf::from(source),
        source: source_err,
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use testdir::testdir;

    use super::{fetch_source, is_url};
    use crate::error::FetchError;

    #[rstest]
    #[case("https://example.org/data.geojson", true)]
    #[case("http://example.org/doc.kml", true)]
    #[case("/tmp/data.geojson", false)]
    #[case("data/https.kml", false)]
    fn test_is_url(#[case] source: &str, #[case] expected: bool) {
        assert_eq!(is_url(source), expected);
    }

    #[test]
    fn test_fetch_local_file() {
        let test_dir = testdir!();
        let filepath = test_dir.join("input.geojson");
        std::fs::write(&filepath, br#"{"features": []}"#).unwrap();

        let raw = fetch_source(filepath.to_str().unwrap()).unwrap();
        assert_eq!(raw, br#"{"features": []}"#);
    }

    #[test]
    fn test_fetch_missing_file() {
        let test_dir = testdir!();
        let filepath = test_dir.join("missing.kml");
        let result = fetch_source(filepath.to_str().unwrap());
        assert!(matches!(result, Err(FetchError::Io { .. })));
    }
}
