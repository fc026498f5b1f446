//! Credential store commands. Token values are never printed.

use serde_json::json;

use super::emit;
use crate::cli::args::TokensCommand;
use crate::error::Result;
use crate::tokens::{SecureTokenStore, TokenKey, parse_account_key};

/// Execute a `tokens` subcommand.
///
/// # Errors
/// Returns `InvalidTokenKey` for malformed keys and `Platform` when secure
/// storage rejects the request.
pub async fn execute(store: &SecureTokenStore, cmd: &TokensCommand) -> Result<()> {
    match cmd {
        TokensCommand::List => {
            let accounts: Vec<_> = store
                .list()
                .await?
                .into_iter()
                .map(|base_id| {
                    let parts = parse_account_key(&base_id);
                    json!({
                        "key": base_id,
                        "provider": parts.as_ref().map(|p| p.provider.clone()),
                        "host": parts.as_ref().and_then(|p| p.host.clone()),
                        "accountId": parts.map(|p| p.account_id),
                    })
                })
                .collect();
            emit("tokens list", json!(accounts))
        }
        TokensCommand::Set { key, token } => {
            let parsed = TokenKey::parse(key)?;
            store.set(key, token.as_str()).await?;
            emit(
                "tokens set",
                json!({ "account": parsed.base_id, "slot": parsed.slot.as_str(), "stored": true }),
            )
        }
        TokensCommand::Delete { key } => {
            let parsed = TokenKey::parse(key)?;
            store.delete(key).await?;
            emit(
                "tokens delete",
                json!({ "account": parsed.base_id, "slot": parsed.slot.as_str(), "deleted": true }),
            )
        }
    }
}
