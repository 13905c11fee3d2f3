pub mod intent;
pub mod responses;
pub mod session;
