pub mod device;

pub use device::{detect_device, DeviceInfo, DeviceType};
