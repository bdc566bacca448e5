//! query command - Run SQL against the server and list saved queries
//!
//! Time bounds accept `now`, a duration back from now (`30s`, `10m`, `1h`,
//! `2d`, `1w`), or an RFC3339 timestamp. Both are sent to the server as
//! RFC3339 in UTC.

use anyhow::{anyhow, bail, Context as _, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::client::{QueryRequest, SavedQuery, ServerClient};
use crate::engine::Context;
use crate::ui::output;

/// Resolved query time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl QueryRange {
    /// Parse `from` and `to` relative to `now`.
    pub fn parse(from: &str, to: &str, now: DateTime<Utc>) -> Result<Self> {
        let start = parse_time(from, now).with_context(|| format!("invalid --from '{}'", from))?;
        let end = parse_time(to, now).with_context(|| format!("invalid --to '{}'", to))?;
        if start >= end {
            bail!("--from must be earlier than --to");
        }
        Ok(Self { start, end })
    }
}

/// Parse one time bound.
pub fn parse_time(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("now") {
        return Ok(now);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }

    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| anyhow!("missing unit; use s, m, h, d or w"))?;
    let (amount, unit) = input.split_at(split);
    let amount: i64 = amount
        .parse()
        .map_err(|_| anyhow!("expected a number before the unit"))?;

    let back = match unit {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        "w" => Duration::try_weeks(amount),
        other => bail!("unknown unit '{}'; use s, m, h, d or w", other),
    }
    .ok_or_else(|| anyhow!("duration out of range"))?;

    now.checked_sub_signed(back)
        .ok_or_else(|| anyhow!("duration out of range"))
}

/// Run a query and print the records as pretty JSON.
pub fn run(ctx: &Context, client: &ServerClient, query: &str, from: &str, to: &str) -> Result<()> {
    let range = QueryRange::parse(from, to, Utc::now())?;
    let request = QueryRequest {
        query: query.to_string(),
        start_time: range.start.to_rfc3339_opts(SecondsFormat::Secs, true),
        end_time: range.end.to_rfc3339_opts(SecondsFormat::Secs, true),
    };

    let records = ctx
        .block_on(client.query(&request))
        .context("query failed")?;
    output::result(serde_json::to_string_pretty(&records)?);
    Ok(())
}

/// List the saved queries of the profile's user.
pub fn list(ctx: &Context, client: &ServerClient) -> Result<()> {
    let saved = ctx
        .block_on(client.list_saved_queries())
        .context("failed to list saved queries")?;

    if saved.is_empty() {
        output::print("No saved queries.", ctx.verbosity());
        return Ok(());
    }
    let rendered: Vec<String> = saved.iter().map(render_saved).collect();
    output::result(rendered.join("\n"));
    Ok(())
}

fn render_saved(saved: &SavedQuery) -> String {
    let mut rows = vec![("stream", saved.stream_name.clone())];
    if let Some(text) = &saved.query.filter_query {
        rows.push(("query", text.clone()));
    }
    if let Some(range) = &saved.time_filter {
        rows.push(("range", format!("{} .. {}", range.from, range.to)));
    }
    format!("{}\n{}", saved.filter_name, output::format_fields(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn now_keyword() {
        assert_eq!(parse_time("now", now()).unwrap(), now());
        assert_eq!(parse_time(" NOW ", now()).unwrap(), now());
    }

    #[test]
    fn relative_durations() {
        assert_eq!(
            parse_time("10m", now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 11, 50, 0).unwrap()
        );
        assert_eq!(
            parse_time("2d", now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 4, 29, 12, 0, 0).unwrap()
        );
        assert_eq!(
            parse_time("1w", now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 4, 24, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn rfc3339_with_offset() {
        assert_eq!(
            parse_time("2024-05-01T14:00:00+02:00", now()).unwrap(),
            now()
        );
    }

    #[test]
    fn bad_inputs() {
        assert!(parse_time("10", now()).is_err());
        assert!(parse_time("m", now()).is_err());
        assert!(parse_time("10y", now()).is_err());
        assert!(parse_time("yesterday", now()).is_err());
    }

    #[test]
    fn saved_query_rendering() {
        let saved: SavedQuery = serde_json::from_value(serde_json::json!({
            "filter_name": "errors",
            "stream_name": "backend",
            "query": {"filter_type": "sql", "filter_query": "select * from backend"},
            "time_filter": {"from": "2024-05-01T11:00:00Z", "to": "2024-05-01T12:00:00Z"}
        }))
        .unwrap();

        let rendered = render_saved(&saved);

        assert!(rendered.starts_with("errors\n"));
        assert!(rendered.contains("select * from backend"));
        assert!(rendered.contains("2024-05-01T11:00:00Z .. 2024-05-01T12:00:00Z"));
    }

    #[test]
    fn range_must_be_ordered() {
        assert!(QueryRange::parse("now", "1h", now()).is_err());
        let range = QueryRange::parse("1h", "now", now()).unwrap();
        assert_eq!(range.end, now());
    }
}
