//! Unit tests for catalog construction and lookups.

use super::*;
use crate::catalog::platform::{Arch, Os};
use crate::catalog::sha256_digest::Sha256Digest;
use crate::catalog::source::SourceLocation;
use rstest::{fixture, rstest};

const MAC_ARM: Platform = Platform::new(Os::MacOs, Arch::Arm64);
const LINUX_AMD: Platform = Platform::new(Os::Linux, Arch::Amd64);

fn entry(version: &str, platform: Platform) -> ArtifactEntry {
    ArtifactEntry::new(
        Version::parse(version).expect("valid version"),
        platform,
        SourceLocation::Remote(format!("https://example.test/{version}/{platform}.zip")),
        Sha256Digest::of_bytes(version.as_bytes()),
    )
}

#[fixture]
fn catalog() -> Catalog {
    Catalog::new(
        "guilde-cli",
        "bin/guilde-cli",
        vec![
            entry("0.43.0", MAC_ARM),
            entry("0.44.0", MAC_ARM),
            entry("0.44.0", LINUX_AMD),
            entry("0.45.0-rc.1", MAC_ARM),
        ],
    )
    .expect("valid catalog")
}

#[test]
fn rejects_duplicate_keys() {
    let err = Catalog::new(
        "tool",
        "tool",
        vec![
            entry("0.44.0", MAC_ARM),
            entry("0.44.0", LINUX_AMD),
            entry("0.44.0", MAC_ARM),
        ],
    )
    .expect_err("expected duplicate rejection");
    assert_eq!(
        err,
        CatalogError::DuplicateEntry {
            version: "0.44.0".to_owned(),
            platform: "macos/arm64".to_owned(),
            first: 0,
            second: 2,
        }
    );
}

#[test]
fn same_version_on_different_platforms_is_not_a_duplicate() {
    let result = Catalog::new(
        "tool",
        "tool",
        vec![entry("1.0.0", MAC_ARM), entry("1.0.0", LINUX_AMD)],
    );
    assert!(result.is_ok());
}

#[test]
fn parse_detects_duplicates_across_aliases() {
    let digest = "0".repeat(64);
    let text = format!(
        concat!(
            "name = \"tool\"\n",
            "[[artifacts]]\nversion = \"1.0.0\"\nos = \"darwin\"\narch = \"aarch64\"\n",
            "url = \"https://example.test/a\"\nsha256 = \"{digest}\"\n",
            "[[artifacts]]\nversion = \"1.0.0\"\nos = \"macos\"\narch = \"arm64\"\n",
            "url = \"https://example.test/b\"\nsha256 = \"{digest}\"\n",
        ),
        digest = digest
    );
    let err = Catalog::parse(&text, None).expect_err("expected duplicate rejection");
    assert!(matches!(err, CatalogError::DuplicateEntry { .. }));
}

#[rstest]
fn get_matches_exact_key(catalog: Catalog) {
    let version = Version::new(0, 44, 0);
    let found = catalog.get(&version, LINUX_AMD).expect("entry present");
    assert_eq!(found.platform(), LINUX_AMD);
    assert!(
        catalog
            .get(&version, Platform::new(Os::Linux, Arch::Arm64))
            .is_none()
    );
}

#[rstest]
fn supports_reports_published_platforms(catalog: Catalog) {
    assert!(catalog.supports(MAC_ARM));
    assert!(catalog.supports(LINUX_AMD));
    assert!(!catalog.supports(Platform::new(Os::MacOs, Arch::Amd64)));
}

#[rstest]
fn latest_prefers_stable_releases(catalog: Catalog) {
    assert_eq!(catalog.latest_for(MAC_ARM), Some(&Version::new(0, 44, 0)));
    assert_eq!(catalog.latest_for(LINUX_AMD), Some(&Version::new(0, 44, 0)));
    assert_eq!(
        catalog.latest_for(Platform::new(Os::Linux, Arch::Arm64)),
        None
    );
}

#[test]
fn latest_falls_back_to_prerelease() {
    let catalog =
        Catalog::new("tool", "tool", vec![entry("1.0.0-beta.2", MAC_ARM)]).expect("valid");
    assert_eq!(
        catalog.latest_for(MAC_ARM).map(ToString::to_string),
        Some("1.0.0-beta.2".to_owned())
    );
}

#[test]
fn load_file_resolves_relative_urls_against_manifest_dir() {
    let temp = tempfile::tempdir().expect("temp dir");
    let dir = camino::Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
    let manifest_path = dir.join("tool.toml");
    let text = format!(
        concat!(
            "name = \"tool\"\n",
            "[[artifacts]]\nversion = \"1.0.0\"\nos = \"linux\"\narch = \"amd64\"\n",
            "url = \"dist/tool-linux-amd64\"\nsha256 = \"{}\"\n",
        ),
        "0".repeat(64)
    );
    std::fs::write(&manifest_path, text).expect("write manifest");

    let catalog = Catalog::load_file(&manifest_path).expect("valid manifest");
    let entry = catalog.entries().first().expect("entry");
    assert_eq!(
        entry.source(),
        &SourceLocation::Local(dir.join("dist/tool-linux-amd64"))
    );
}

#[test]
fn load_file_reports_missing_file() {
    let err = Catalog::load_file(Utf8Path::new("/nonexistent/manifest.toml"))
        .expect_err("expected read failure");
    assert!(matches!(err, CatalogError::Read { .. }));
}

#[test]
fn from_bytes_rejects_invalid_utf8() {
    let err = Catalog::from_bytes(&[0xff, 0xfe], None).expect_err("expected failure");
    assert!(err.to_string().contains("UTF-8"));
}

#[test]
fn catalog_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Catalog>();
}
