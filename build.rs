use std::env;

fn main() {
    let profile = env::var("PROFILE").unwrap_or_else(|_| "debug".to_string());

    // Release builds report the crate version, debug builds a build timestamp
    let version = match profile.as_str() {
        "release" => {
            println!("cargo:rerun-if-changed=Cargo.toml");
            env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "unknown".to_string())
        }
        _ => format!("dev-{}", chrono::Utc::now().format("%Y%m%d%H%M%S")),
    };

    println!("cargo:rustc-env=KB_MACRO_BUILD_VERSION={}", version);
}
