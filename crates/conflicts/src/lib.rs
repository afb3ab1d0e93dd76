//! Post-hoc detection and repair of double bookings in a committed schedule.

mod detect;
mod resolve;

pub use detect::detect;
pub use resolve::resolve;
