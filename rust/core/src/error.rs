// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for damage record operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or editing damage records
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid measurement: {0}")]
    InvalidMeasurement(String),

    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),
}
