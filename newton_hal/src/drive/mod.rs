//! Motor axis control over a fieldbus transport.

mod controller;

pub use controller::DriveController;
