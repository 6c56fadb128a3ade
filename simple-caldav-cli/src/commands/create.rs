use anyhow::{Context, Result};
use simple_caldav_core::{CalDavClient, Event, EventStatus};

use super::{parse_datetime, print_json};

pub async fn run(
    client: &CalDavClient,
    summary: String,
    start: &str,
    end: &str,
    location: Option<String>,
    status: Option<&str>,
) -> Result<()> {
    let event = build_event(summary, start, end, location, status)?;
    let outcome = client
        .create_event(&event)
        .await
        .with_context(|| format!("Failed to create event '{}'", event.summary))?;

    print_json(&outcome)
}

fn build_event(
    summary: String,
    start: &str,
    end: &str,
    location: Option<String>,
    status: Option<&str>,
) -> Result<Event> {
    let start = parse_datetime(start)?;
    let end = parse_datetime(end)?;
    if end < start {
        anyhow::bail!("End must not be before start");
    }

    let mut event = Event::new(summary, start, end);
    event.location = location.filter(|l| !l.is_empty());
    event.status = status.map(str::parse::<EventStatus>).transpose()?;
    Ok(event)
}
