use anyhow::Result;
use simple_caldav_core::CalDavClient;

pub async fn run(client: &CalDavClient, href: &str, etag: Option<&str>) -> Result<()> {
    client.delete_event(href, etag).await?;
    eprintln!("Deleted {}", href);
    Ok(())
}
