pub mod billing;
pub mod live;
pub mod matches;
pub mod roster;
pub mod session;
