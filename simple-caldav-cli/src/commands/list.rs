use anyhow::Result;
use chrono::{Duration, Utc};
use simple_caldav_core::{CalDavClient, TimeRange};

use super::{parse_date_end, parse_date_start, print_json};

/// Lists every event, or only those overlapping `--from`/`--to` when either is given.
pub async fn run(client: &CalDavClient, from: Option<&str>, to: Option<&str>) -> Result<()> {
    let events = if from.is_none() && to.is_none() {
        client.list_events().await?
    } else {
        let now = Utc::now();
        let start = match from {
            Some(s) => parse_date_start(s)?,
            None => now,
        };
        let end = match to {
            Some(s) => parse_date_end(s)?,
            None => start + Duration::days(365),
        };
        if end <= start {
            anyhow::bail!("--to must be after --from");
        }
        client.list_events_in_range(TimeRange { start, end }).await?
    };

    print_json(&events)
}
