//! Build script for cipherdb.
//!
//! On non-WASM targets this compiles the sqlite3mc amalgamation into a static
//! library. The amalgamation is taken from `CIPHERDB_SQLITE3MC_DIR` when set
//! (offline builds), otherwise downloaded from a pinned upstream release and
//! checksum-verified.
//!
//! On WASM targets compilation is skipped because `sqlite-wasm-rs` provides
//! the pre-compiled WASM binary.

use std::path::{Path, PathBuf};
use std::process::Command;

// Pinned sqlite3mc release.
const SQLITE3MC_VERSION: &str = "2.2.7";
const SQLITE_VERSION: &str = "3.51.2";
const DOWNLOAD_URL: &str = "https://github.com/utelle/SQLite3MultipleCiphers/releases/download/v2.2.7/sqlite3mc-2.2.7-sqlite-3.51.2-amalgamation.zip";
const EXPECTED_SHA256: &str =
    "8e84aadc53bc09bda9cd307745a178191e7783e1b6478d74ffbcdf6a04f98085";

const SOURCE_DIR_ENV: &str = "CIPHERDB_SQLITE3MC_DIR";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed={SOURCE_DIR_ENV}");
    build_sqlite3mc();
}

fn build_sqlite3mc() {
    let target_arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    if target_arch == "wasm32" {
        return;
    }

    let source_dir = match std::env::var_os(SOURCE_DIR_ENV) {
        Some(dir) => PathBuf::from(dir),
        None => fetch_amalgamation(),
    };
    let amalgamation_c = source_dir.join("sqlite3mc_amalgamation.c");
    assert!(
        amalgamation_c.exists(),
        "sqlite3mc_amalgamation.c not found in {}",
        source_dir.display()
    );

    compile(&amalgamation_c, &source_dir);
}

/// Downloads and extracts the pinned amalgamation into `OUT_DIR`, reusing a
/// previous extraction when present.
fn fetch_amalgamation() -> PathBuf {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR not set"));
    let source_dir = out_dir.join(format!("sqlite3mc-{SQLITE3MC_VERSION}"));
    let amalgamation_c = source_dir.join("sqlite3mc_amalgamation.c");
    let amalgamation_h = source_dir.join("sqlite3mc_amalgamation.h");

    if !amalgamation_c.exists() || !amalgamation_h.exists() {
        std::fs::create_dir_all(&source_dir).expect("failed to create source dir");
        let zip_path = out_dir.join("sqlite3mc-amalgamation.zip");
        download(&zip_path);
        verify_checksum(&zip_path);
        extract(&zip_path, &source_dir);
        assert!(
            amalgamation_h.exists(),
            "sqlite3mc_amalgamation.h not found after extraction"
        );
    }
    source_dir
}

/// Downloads the pinned amalgamation zip using curl.
fn download(dest: &Path) {
    println!(
        "cargo:warning=Downloading sqlite3mc {SQLITE3MC_VERSION} (SQLite {SQLITE_VERSION})..."
    );
    let status = Command::new("curl")
        .args(["-fsSL", "-o"])
        .arg(dest)
        .arg(DOWNLOAD_URL)
        .status()
        .expect("failed to run curl -- is it installed?");
    assert!(status.success(), "curl failed with status {status}");
}

/// Verifies the SHA-256 checksum of the downloaded zip.
fn verify_checksum(zip_path: &Path) {
    // shasum on macOS, sha256sum on Linux.
    let output = Command::new("shasum")
        .args(["-a", "256"])
        .arg(zip_path)
        .output()
        .or_else(|_| Command::new("sha256sum").arg(zip_path).output())
        .expect("failed to run shasum or sha256sum -- is one installed?");

    assert!(output.status.success(), "checksum command failed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let actual_hash = stdout.split_whitespace().next().unwrap_or("");
    assert_eq!(
        actual_hash, EXPECTED_SHA256,
        "sqlite3mc checksum mismatch!\n  expected: {EXPECTED_SHA256}\n  actual:   {actual_hash}"
    );
}

/// Extracts the amalgamation source and header into `dest_dir`.
fn extract(zip_path: &Path, dest_dir: &Path) {
    let status = Command::new("unzip")
        .args(["-o", "-j"])
        .arg(zip_path)
        .args(["sqlite3mc_amalgamation.c", "sqlite3mc_amalgamation.h"])
        .arg("-d")
        .arg(dest_dir)
        .status()
        .expect("failed to run unzip -- is it installed?");
    assert!(status.success(), "unzip failed with status {status}");
}

/// Compiles the sqlite3mc amalgamation into a static library.
fn compile(amalgamation_c: &Path, include_dir: &Path) {
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    let mut build = cc::Build::new();
    build
        .file(amalgamation_c)
        .include(include_dir)
        .define("SQLITE_CORE", None)
        .define("SQLITE_THREADSAFE", "1")
        // Declared column types feed the row coercion layer.
        .define("SQLITE_ENABLE_COLUMN_METADATA", None)
        .define("SQLITE_ENABLE_JSON1", None)
        .define("SQLITE_DEFAULT_WAL_SYNCHRONOUS", "1")
        .define("SQLITE_DQS", "0")
        .define("CODEC_TYPE", "CODEC_TYPE_CHACHA20")
        .define("ARGON2_NO_THREADS", None)
        .define("SQLITE_DEFAULT_MEMSTATUS", "0")
        .define("SQLITE_LIKE_DOESNT_MATCH_BLOBS", None)
        .define("SQLITE_OMIT_DEPRECATED", None)
        .define("SQLITE_OMIT_SHARED_CACHE", None);

    match target_os.as_str() {
        "android" | "ios" | "macos" => {
            build.define("HAVE_USLEEP", "1");
            build.define("HAVE_LOCALTIME_R", "1");
        }
        "linux" => {
            build.define("HAVE_USLEEP", "1");
            build.define("HAVE_LOCALTIME_R", "1");
            build.define("HAVE_POSIX_FALLOCATE", "1");
        }
        _ => {}
    }

    build.warnings(false);
    build.compile("sqlite3mc");
}
