pub mod display_names;
pub mod fees;
