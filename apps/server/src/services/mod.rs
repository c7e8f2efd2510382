// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Service modules for analysis, vision access and caching.

pub mod cache;
pub mod session;
pub mod vision;

pub use cache::DiskCache;
pub use session::{analysis_config, build_session};
pub use vision::{HttpVisionClient, RequestVision};
