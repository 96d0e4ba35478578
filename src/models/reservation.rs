use serde::{Deserialize, Serialize};
use time::Date;

time::serde::format_description!(reservation_date, Date, "[year]-[month]-[day]");

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Reservation {
    pub id: i32,
    pub guest_id: i32,
    pub property_id: i32,
    #[serde(with = "reservation_date")]
    pub start_date: Date,
    #[serde(with = "reservation_date")]
    pub end_date: Date,
}
