#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod coalesce;
mod error;
#[cfg(feature = "futures")]
mod futures;
#[cfg(feature = "futures")]
mod state;
#[cfg(feature = "async-tokio")]
mod supervisor;

pub use crate::coalesce::*;
pub use crate::error::*;
#[cfg(feature = "futures")]
pub use crate::futures::*;
#[cfg(feature = "futures")]
pub use crate::state::*;
#[cfg_attr(docsrs, doc(cfg(feature = "async-tokio")))]
#[cfg(feature = "async-tokio")]
pub use crate::supervisor::*;
