use anyhow::Result;
use simple_caldav_core::CalDavClient;

use super::print_json;

pub async fn run(client: &CalDavClient) -> Result<()> {
    let info = client.discover_token().await?;
    print_json(&info)
}
