pub mod bar;

pub use bar::{normalize, DailyBar};
