/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

pub mod demo;
pub mod identity;

use anyhow::anyhow;
use kitchen_sink_client::ClientConfig;
use url::Url;

/// Client settings from the environment, with `--url` taking precedence.
pub fn load_config(url: Option<&Url>) -> anyhow::Result<ClientConfig> {
    let mut config = ClientConfig::from_env().map_err(|e| anyhow!(e))?;
    if let Some(url) = url {
        config.identity_api_url = url.to_string();
    }
    Ok(config)
}
