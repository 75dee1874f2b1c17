use std::env;

fn main() {
    let version =
        env::var("XRAY_APP_VERSION").unwrap_or_else(|_| env::var("CARGO_PKG_VERSION").unwrap());
    println!("cargo:rustc-env=XRAY_APP_VERSION={version}");
    println!("cargo:rerun-if-env-changed=XRAY_APP_VERSION");
}
