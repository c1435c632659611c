use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[schema(example = "5f0c7e9a2b4d4c1e9a7b3d2f1e0c9b8a_2026-01-05")]
    pub id: String,
    #[schema(example = "5f0c7e9a2b4d4c1e9a7b3d2f1e0c9b8a")]
    pub user_id: String,
    #[schema(example = "09:02:11")]
    pub in_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "17:31:40", nullable = true)]
    pub out_time: Option<String>,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
}

impl AttendanceRecord {
    /// One record per user and day, so the day is part of the id.
    pub fn id_for(user_id: &str, date: NaiveDate) -> String {
        format!("{}_{}", user_id, date.format("%Y-%m-%d"))
    }
}
