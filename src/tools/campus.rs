//! Static campus FAQ tools.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;

pub const CAFETERIA_TIMINGS: &str = "The cafeteria is open from 8:00 AM to 10:00 PM.";
pub const LIBRARY_HOURS: &str =
    "The library is open from 9:00 AM to 9:00 PM on weekdays and 10:00 AM to 6:00 PM on weekends.";
pub const EVENT_SCHEDULE: &str =
    "Upcoming events: AI Hackathon on 25th Oct, Annual Sports Day on 15th Nov.";

fn no_params() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}

pub struct GetCafeteriaTimings;

#[async_trait]
impl Tool for GetCafeteriaTimings {
    fn name(&self) -> &str {
        "get_cafeteria_timings"
    }

    fn description(&self) -> &str {
        "Provides the timings for the campus cafeteria."
    }

    fn parameters_schema(&self) -> Value {
        no_params()
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<String> {
        Ok(CAFETERIA_TIMINGS.to_string())
    }
}

pub struct GetLibraryHours;

#[async_trait]
impl Tool for GetLibraryHours {
    fn name(&self) -> &str {
        "get_library_hours"
    }

    fn description(&self) -> &str {
        "Provides the operating hours for the campus library."
    }

    fn parameters_schema(&self) -> Value {
        no_params()
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<String> {
        Ok(LIBRARY_HOURS.to_string())
    }
}

pub struct GetEventSchedule;

#[async_trait]
impl Tool for GetEventSchedule {
    fn name(&self) -> &str {
        "get_event_schedule"
    }

    fn description(&self) -> &str {
        "Provides the schedule for upcoming campus events."
    }

    fn parameters_schema(&self) -> Value {
        no_params()
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<String> {
        Ok(EVENT_SCHEDULE.to_string())
    }
}
