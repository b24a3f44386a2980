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

use anyhow::Context;
use identity_client::IdentityApiClient;
use tracing::info;

use crate::cli_args::IdentityArgs;

pub async fn print_identity(args: IdentityArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.url.as_ref())?;
    let client = IdentityApiClient::new(&config.identity_api_url);
    info!("Requesting identity from {}", client.base_url());

    let identity = client
        .get_identity()
        .await
        .context("failed to fetch identity")?;
    println!("User:       {}", identity.user.id);
    println!("Expires on: {}", identity.access_token.expires_on);
    println!("Token:      {}", identity.access_token.token);

    if args.refresh {
        let token = client
            .refresh_token(&identity.user.id)
            .await
            .context("failed to refresh token")?;
        println!();
        println!("Refreshed token, expires on {}", token.expires_on);
        println!("Token:      {}", token.token);
    }
    Ok(())
}
