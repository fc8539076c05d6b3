//! Domain types for the offline meter-reading engine.

mod device;
mod exception;
mod meter;
mod reading;
mod route;

pub use device::{ConnectionClass, DeviceInfo, GeoPoint, PhotoAttachment};
pub use exception::{ExceptionKind, MeterException};
pub use meter::{Meter, ServiceKind};
pub use reading::{Reading, ValidationStatus};
pub use route::{Route, RouteStatus};
