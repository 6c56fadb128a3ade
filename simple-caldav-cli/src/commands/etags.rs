use anyhow::Result;
use simple_caldav_core::CalDavClient;

use super::print_json;

pub async fn run(client: &CalDavClient) -> Result<()> {
    let tags = client.list_etags().await?;
    print_json(&tags)
}
