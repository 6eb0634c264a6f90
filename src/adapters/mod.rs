//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter      | Implements              | Connects to               |
//! |--------------|-------------------------|---------------------------|
//! | `sysfs_gpio` | GpioPort, LineProvider  | `/sys/class/gpio`         |
//! | `spidev`     | BusProbe                | `/dev/spidevB.C`          |
//! | `time`       | WallClock               | host real-time clock      |
//! | `log_sink`   | EventSink               | `log` facade              |

pub mod log_sink;
#[cfg(feature = "linux")]
pub mod spidev;
#[cfg(unix)]
pub mod sysfs_gpio;
pub mod time;
