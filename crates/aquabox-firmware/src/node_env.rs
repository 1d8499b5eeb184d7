//! Build-time node settings
//!
//! `build.rs` writes the credentials and server address it found in `.env`
//! into `OUT_DIR/node_env.rs`; everything else keeps the core defaults.

use alloc::string::String;

use aquabox_core::config::NodeConfig;

include!(concat!(env!("OUT_DIR"), "/node_env.rs"));

pub fn node_config() -> NodeConfig {
    let mut config = NodeConfig::default();
    config.wifi.ssid = String::from(WIFI_SSID);
    config.wifi.password = String::from(WIFI_PASSWORD);
    config.server.host = String::from(SERVER_HOST);
    config.server.port = SERVER_PORT;
    config
}
