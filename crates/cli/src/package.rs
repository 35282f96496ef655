use std::{fs, path::Path};

use blockstream_types::Package;
use url::Url;

/// Load a package from a local file or an `http(s)://` URL.
///
/// `.yaml` and `.yml` sources are parsed as YAML, anything else as JSON.
pub async fn load_package(source: &str) -> Result<Package, String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let url = Url::parse(source).map_err(|e| format!("Invalid package URL {}: {}", source, e))?;
        let content = fetch(&url).await?;
        return parse_package(&content, url.path());
    }

    let path = Path::new(source);
    if !path.exists() {
        return Err(format!("Package not found at {}", path.display()));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    parse_package(&content, source)
}

async fn fetch(url: &Url) -> Result<String, String> {
    let response = reqwest::get(url.clone())
        .await
        .map_err(|e| format!("Failed to fetch {}: {}", url, e))?;

    if !response.status().is_success() {
        return Err(format!(
            "Failed to fetch {}: server answered {}",
            url,
            response.status()
        ));
    }

    response
        .text()
        .await
        .map_err(|e| format!("Failed to read {}: {}", url, e))
}

fn parse_package(content: &str, name: &str) -> Result<Package, String> {
    let is_yaml = matches!(
        Path::new(name).extension().and_then(|s| s.to_str()),
        Some("yaml" | "yml")
    );

    if is_yaml {
        serde_yml::from_str(content).map_err(|e| format!("Failed to parse {}: {}", name, e))
    } else {
        serde_json::from_str(content).map_err(|e| format!("Failed to parse {}: {}", name, e))
    }
}
