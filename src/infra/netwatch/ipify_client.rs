use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::core::netwatch::{NetwatchError, PublicIpSource};

const IPIFY_URL: &str = "https://api.ipify.org?format=json";

pub struct IpifyClient {
    client: Client,
}

impl IpifyClient {
    pub fn new() -> Result<Self, NetwatchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NetwatchError::Lookup(e.to_string()))?;
        Ok(Self { client })
    }
}

#[derive(Deserialize)]
struct ApiIp {
    ip: String,
}

fn parse_ip(body: ApiIp) -> Result<IpAddr, NetwatchError> {
    body.ip
        .trim()
        .parse()
        .map_err(|_| NetwatchError::Lookup(format!("`{}` is not an IP address", body.ip)))
}

#[async_trait]
impl PublicIpSource for IpifyClient {
    async fn current_ip(&self) -> Result<IpAddr, NetwatchError> {
        let response = self
            .client
            .get(IPIFY_URL)
            .send()
            .await
            .map_err(|e| NetwatchError::Lookup(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NetwatchError::Lookup(format!("ipify returned HTTP {}", response.status())));
        }

        let body: ApiIp = response
            .json()
            .await
            .map_err(|e| NetwatchError::Lookup(e.to_string()))?;
        parse_ip(body)
    }
}
