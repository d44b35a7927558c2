use chrono::Utc;
use std::env;
use std::fs;
use std::path::Path;

fn read_plugin_api_version(cargo_toml_path: &Path) -> String {
    fs::read_to_string(cargo_toml_path)
        .ok()
        .and_then(|content| content.parse::<toml::Table>().ok())
        .and_then(|manifest| {
            manifest
                .get("package")?
                .get("metadata")?
                .get("plugin_api_version")?
                .as_integer()
        })
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn read_git_hash() -> String {
    std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    let out_dir = env::var_os("OUT_DIR").expect("OUT_DIR is set by cargo");
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo");
    let dest_path = Path::new(&out_dir).join("version.rs");
    let cargo_toml_path = Path::new(&manifest_dir).join("Cargo.toml");

    let generated = format!(
        "pub const PLUGIN_API_VERSION: &str = \"{}\";\n\
         pub const BUILD_TIME: &str = \"{}\";\n\
         pub const GIT_HASH: &str = \"{}\";\n",
        read_plugin_api_version(&cargo_toml_path),
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        read_git_hash()
    );

    // Only touch the file when the content changes to keep incremental builds quiet
    let unchanged = fs::read_to_string(&dest_path)
        .map(|existing| existing == generated)
        .unwrap_or(false);
    if !unchanged {
        fs::write(&dest_path, generated).expect("failed to write version.rs");
    }

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
