#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

pub mod breadcrumb;
pub mod enrich;
mod error;
pub mod export;
pub mod extract;
pub mod feed;
pub mod stop_event;
pub mod validate;
mod value;

use serde::{Deserialize, Serialize};

pub use self::breadcrumb::{Breadcrumb, ServiceKey, Trip};
pub use self::error::ConvertError;
pub use self::export::{BatchSummary, ConvertSummary};
pub use self::extract::Extract;
pub use self::feed::RawRecord;
pub use self::stop_event::StopEvent;
pub use self::validate::ValidationReport;
pub use self::value::Value;

/// The agency's identifier for one vehicle run. Every breadcrumb recorded
/// during the run carries it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TripID(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleID(pub i64);
