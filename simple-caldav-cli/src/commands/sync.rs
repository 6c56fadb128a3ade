use anyhow::Result;
use simple_caldav_core::CalDavClient;
use tracing::info;

use super::print_json;

/// Prints the delta and the token to pass as `--token` next time.
pub async fn run(client: &CalDavClient, token: Option<&str>) -> Result<()> {
    let result = client.sync_collection(token).await?;
    info!(changes = result.collection.len(), token = %result.sync_token, "sync complete");
    print_json(&result)
}
