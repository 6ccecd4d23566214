use std::{collections::BTreeMap, net::IpAddr};

use vhadmin_test_utils::FakeToolchain;

use crate::{
    config::{Config, FileConfig},
    state::AppState,
};

pub(crate) fn no_env(_: &str) -> Option<String> {
    None
}

pub(crate) const PUBLIC_IP: &str = "127.0.0.1";

/// Probe that answers only for query port 2458.
pub(crate) const PROBE_2458_ONLY: &str =
    r#"case "$*" in *"-p 2458 "*) echo "OK: up" ;; *) echo "ERROR: no reply" ;; esac"#;

pub(crate) fn config_for(tc: &FakeToolchain, servers: &[(&str, &str)]) -> Config {
    let file = FileConfig {
        listen: Some("127.0.0.1:0".to_string()),
        toolchain_dir: Some(tc.root().to_path_buf()),
        probe_program: Some(tc.root().join("probe")),
        probe_script: Some(String::new()),
        probe_timeout_ms: Some(2000),
        public_ip: Some(PUBLIC_IP.to_string()),
        servers: Some(
            servers
                .iter()
                .map(|(n, p)| (n.to_string(), p.to_string()))
                .collect::<BTreeMap<_, _>>(),
        ),
        ..FileConfig::default()
    };
    Config::resolve(file, &no_env).expect("test config")
}

pub(crate) fn state_for(tc: &FakeToolchain, servers: &[(&str, &str)]) -> AppState {
    let ip: IpAddr = PUBLIC_IP.parse().expect("ip");
    AppState::new(config_for(tc, servers), ip)
}
