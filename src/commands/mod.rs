pub mod add;
pub mod calendars;
pub mod remove;
