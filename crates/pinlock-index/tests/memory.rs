use pinlock_core::{PackageName, Version};
use pinlock_index::{IndexError, MemoryIndex, PackageIndex};
use tempfile::TempDir;

fn name(s: &str) -> PackageName {
    PackageName::new(s).unwrap()
}

const TOML_INDEX: &str = r#"
[[package]]
name = "A"
version = "2.0"
requires = ["c>=1.0"]

[[package]]
name = "b"
version = "1.0"
requires = ["c<2.0"]

[[package]]
name = "c"
version = "1.5"
"#;

#[tokio::test]
async fn loads_toml_index() {
    let index = MemoryIndex::from_toml_str(TOML_INDEX).unwrap();
    assert_eq!(index.len(), 3);
    let reqs = index
        .declared_requirements(&name("a"), &Version::parse("2.0").unwrap())
        .await
        .unwrap();
    assert_eq!(reqs[0].to_string(), "c>=1.0");
}

#[tokio::test]
async fn loads_json_index_from_path() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("index.json");
    std::fs::write(
        &path,
        r#"{"package": [{"name": "six", "version": "1.16.0"}]}"#,
    )
    .unwrap();
    let index = MemoryIndex::from_path(&path).unwrap();
    let versions = index.available_versions(&name("six")).await.unwrap();
    assert_eq!(versions[0].to_string(), "1.16.0");
}

#[tokio::test]
async fn invalid_requirement_is_reported() {
    let index = MemoryIndex::from_toml_str(
        r#"
[[package]]
name = "a"
version = "1.0"
requires = ["b[extra]"]
"#,
    )
    .unwrap();
    let err = index
        .declared_requirements(&name("a"), &Version::parse("1.0").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::InvalidRequirement { .. }));
}

#[test]
fn invalid_package_name_fails_to_load() {
    let result = MemoryIndex::from_toml_str(
        r#"
[[package]]
name = "-bad"
version = "1.0"
"#,
    );
    assert!(result.is_err());
}

#[test]
fn missing_file_is_index_error() {
    let err = MemoryIndex::from_path(std::path::Path::new("/nonexistent/index.toml")).unwrap_err();
    assert!(err.to_string().contains("Index error"), "got: {err}");
}
