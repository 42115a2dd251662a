// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Composition operators for the rill push-based reactive engine.
//!
//! Each operator lives in its own module behind an extension trait on
//! [`Observable`](rill_core::Observable); import the prelude of the
//! facade crate (or the traits individually) to chain them.

#![allow(clippy::multiple_crate_versions)]

pub mod buffer;
pub mod collect;
pub mod combine_latest;
pub mod concat;
pub mod distinct_until_changed;
pub mod elements;
pub mod error_ops;
pub mod filter;
pub mod flat_map;
pub mod group_by;
pub mod map;
pub mod materialize;
pub mod multicast;
pub mod observe_on;
pub mod redo;
pub mod scan;
pub mod skip;
pub mod start_with;
pub mod subscribe_on;
pub mod switch_map;
pub mod take;
pub mod tap;
pub mod unsubscribe_on;
pub mod window;
pub mod zip;

pub use buffer::BufferExt;
pub use collect::CollectExt;
pub use combine_latest::{
    combine_latest, combine_latest_delay_error, CombineLatestExt,
};
pub use concat::{concat, ConcatExt};
pub use distinct_until_changed::DistinctUntilChangedExt;
pub use elements::ElementsExt;
pub use error_ops::OnErrorExt;
pub use filter::FilterExt;
pub use flat_map::{merge, merge_delay_error, FlatMapExt, FlatMapOptions, DEFAULT_BUFFER_SIZE};
pub use group_by::{GroupByExt, GroupedObservable};
pub use map::MapExt;
pub use materialize::{DematerializeExt, MaterializeExt};
pub use multicast::{ConnectableObservable, MulticastExt};
pub use observe_on::ObserveOnExt;
pub use redo::{RepeatExt, RetryExt};
pub use scan::ScanExt;
pub use skip::SkipExt;
pub use start_with::StartWithExt;
pub use subscribe_on::SubscribeOnExt;
pub use switch_map::SwitchMapExt;
pub use take::TakeExt;
pub use tap::TapExt;
pub use unsubscribe_on::UnsubscribeOnExt;
pub use window::WindowExt;
pub use zip::{zip, zip_delay_error, ZipExt};
