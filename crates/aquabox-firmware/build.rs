//! Bakes Wi-Fi credentials and the server address into the firmware.
//!
//! Values come from the environment, or from a `.env` file in this crate or
//! any parent directory:
//!
//! ```text
//! AQUABOX_WIFI_SSID=my-network
//! AQUABOX_WIFI_PASSWORD=secret
//! AQUABOX_SERVER_HOST=192.168.137.1
//! AQUABOX_SERVER_PORT=80
//! ```

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

const STRING_KEYS: [(&str, &str, &str); 3] = [
    ("AQUABOX_WIFI_SSID", "WIFI_SSID", ""),
    ("AQUABOX_WIFI_PASSWORD", "WIFI_PASSWORD", ""),
    ("AQUABOX_SERVER_HOST", "SERVER_HOST", "192.168.137.1"),
];

fn main() {
    println!("cargo:rerun-if-changed=.env");
    println!("cargo:rerun-if-changed=../../.env");

    // A missing .env is fine, the process environment and defaults still apply.
    if let Ok(path) = dotenvy::dotenv() {
        println!("cargo:rerun-if-changed={}", path.display());
    }

    let mut generated = String::new();
    for (key, name, default) in STRING_KEYS {
        println!("cargo:rerun-if-env-changed={key}");
        let value = env::var(key).unwrap_or_else(|_| default.to_string());
        if key == "AQUABOX_WIFI_SSID" && value.is_empty() {
            println!("cargo:warning={key} is not set, the node will not join any network");
        }
        writeln!(generated, "pub const {name}: &str = {value:?};").unwrap();
    }

    println!("cargo:rerun-if-env-changed=AQUABOX_SERVER_PORT");
    let port: u16 = match env::var("AQUABOX_SERVER_PORT") {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("AQUABOX_SERVER_PORT={raw:?} is not a valid port")),
        Err(_) => 80,
    };
    writeln!(generated, "pub const SERVER_PORT: u16 = {port};").unwrap();

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    fs::write(out_dir.join("node_env.rs"), generated).expect("failed to write node_env.rs");
}
