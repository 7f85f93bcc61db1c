use std::time::Duration;

use reqwest::Client;

const USER_AGENT: &str = concat!("artisan-studio-service/", env!("CARGO_PKG_VERSION"));

pub fn build_http_client() -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT)
        .build()
}
