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

//! Query parameters accepted by the Identity Issuer.

use serde::{Deserialize, Serialize};

/// Query parameters for `GET /Identity/token`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TokenQuery {
    /// The communication user whose token should be reissued.
    #[serde(default)]
    pub user_id: Option<String>,
}
