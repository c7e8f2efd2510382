// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::vision::PhotoFailure;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Run-level failures. Per-item and per-photo problems never surface here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    #[error("No photos to analyze")]
    NoPhotos,

    #[error("All {} photo analyses failed", .failures.len())]
    AllPhotosFailed { failures: Vec<PhotoFailure> },

    #[error("Analysis cancelled")]
    Cancelled,
}
