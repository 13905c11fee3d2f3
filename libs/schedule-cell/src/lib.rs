pub mod services;

pub use services::calendar;
pub use services::slots;
