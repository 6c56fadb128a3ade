use anyhow::Result;
use simple_caldav_core::CalDavClient;

use super::print_json;

pub async fn run(client: &CalDavClient, uid: &str) -> Result<()> {
    match client.get_event(uid).await? {
        Some(event) => print_json(&event),
        None => anyhow::bail!("Event '{}' not found", uid),
    }
}
