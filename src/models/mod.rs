pub mod property;
pub mod reservation;
pub mod user;
