use std::{net::IpAddr, time::Duration};

use anyhow::Context;

use crate::config::Config;

pub fn parse_ip_body(body: &str) -> anyhow::Result<IpAddr> {
    let raw = body.trim();
    raw.parse::<IpAddr>()
        .with_context(|| format!("not an ip address: {raw:?}"))
}

async fn fetch(url: &str) -> anyhow::Result<IpAddr> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("vhadmin-control/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(15))
        .build()
        .context("build http client")?;

    let body = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request {url}"))?
        .error_for_status()
        .with_context(|| format!("{url} returned non-2xx"))?
        .text()
        .await
        .with_context(|| format!("read body from {url}"))?;

    parse_ip_body(&body).with_context(|| format!("parse reply from {url}"))
}

/// The address probes are aimed at: configured, or looked up once at startup.
pub async fn resolve(config: &Config) -> anyhow::Result<IpAddr> {
    if let Some(ip) = config.public_ip {
        return Ok(ip);
    }
    let ip = fetch(&config.public_ip_url).await?;
    tracing::info!(%ip, url = %config.public_ip_url, "discovered public address");
    Ok(ip)
}
