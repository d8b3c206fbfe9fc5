pub mod assignment;
pub mod carrier;
pub mod commercial;
pub mod order;
pub mod volunteer;
