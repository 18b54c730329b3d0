//! Clock tools.

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use parley_conversation::{NoArgs, Tool, ToolContext, ToolFailure};

/// Long date/time pattern, e.g. `Tuesday, October 18, 2026 3:04:05 PM`.
const LONG_FORMAT: &str = "%A, %B %-d, %Y %-I:%M:%S %p";

/// Formats a timestamp in the long human-readable form.
#[must_use]
pub fn long_format<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(LONG_FORMAT).to_string()
}

/// Returns the current local date and time.
pub struct CurrentTime;

#[async_trait]
impl Tool for CurrentTime {
    type Args = NoArgs;

    fn name(&self) -> &'static str {
        "current_time"
    }

    fn description(&self) -> &'static str {
        "Gets the current date and time"
    }

    async fn call(&self, _ctx: &ToolContext, _args: NoArgs) -> Result<String, ToolFailure> {
        Ok(long_format(&Local::now()))
    }
}

/// Returns the current local weekday.
pub struct CurrentDayOfWeek;

#[async_trait]
impl Tool for CurrentDayOfWeek {
    type Args = NoArgs;

    fn name(&self) -> &'static str {
        "current_day_of_week"
    }

    fn description(&self) -> &'static str {
        "Gets the current day of the week"
    }

    async fn call(&self, _ctx: &ToolContext, _args: NoArgs) -> Result<String, ToolFailure> {
        Ok(Local::now().format("%A").to_string())
    }
}
