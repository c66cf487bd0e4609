// Domain types and value objects
mod field;
mod observation;

pub use field::Field;
pub use observation::Observation;
