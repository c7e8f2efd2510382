// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request payloads into room models and depth frames.

use crate::error::ApiError;
use crate::types::{AnalysisOptions, AnalyzeRequest, DepthPayload, PhotoPayload, RoomPayload};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use damage_locator_core::SurfaceCategory;
use damage_locator_geometry::transform::matrix_from_column_major;
use damage_locator_geometry::{
    CameraIntrinsics, DepthBuffer, DepthFrame, Matrix3, Matrix4, RoomModel, SurfaceRecord,
};
use damage_locator_processing::AnalysisConfig;

/// Build the room model from the scan payload.
pub fn build_room(room: &RoomPayload) -> Result<RoomModel, ApiError> {
    let surfaces = room
        .surfaces
        .iter()
        .map(|surface| -> Result<SurfaceRecord, ApiError> {
            let category = SurfaceCategory::parse(&surface.category).ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "surface {} has unknown category {:?}",
                    surface.id, surface.category
                ))
            })?;
            let transform = matrix_from_column_major(&surface.transform)?;
            Ok(SurfaceRecord::new(
                surface.id.clone(),
                category,
                transform,
                surface.width,
                surface.height,
            ))
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    Ok(RoomModel::new(surfaces, room.ceiling_height)?)
}

/// Build the depth frame for one photo.
///
/// A missing pose becomes a non-finite matrix, which the matcher treats as
/// "no usable pose".
pub fn build_frame(index: usize, photo: &PhotoPayload) -> Result<DepthFrame, ApiError> {
    let pose = match &photo.pose {
        Some(values) => matrix_from_column_major(values)?,
        None => Matrix4::from_element(f64::NAN),
    };

    let buffer = photo
        .depth
        .as_ref()
        .map(|depth| decode_depth(index, depth))
        .transpose()?;
    let intrinsics = photo.intrinsics.map(|rows| {
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        CameraIntrinsics::from_matrix(&Matrix3::from_row_slice(&flat))
    });

    Ok(DepthFrame::new(
        photo.image_width,
        photo.image_height,
        buffer,
        intrinsics,
        pose,
    ))
}

fn decode_depth(index: usize, depth: &DepthPayload) -> Result<DepthBuffer, ApiError> {
    let data = STANDARD.decode(depth.data.as_bytes()).map_err(|e| {
        ApiError::BadRequest(format!("photo {} depth data is not base64: {}", index, e))
    })?;
    let row_stride = depth.row_stride.unwrap_or(depth.width as usize * 4);
    Ok(DepthBuffer::new(data, depth.width, depth.height, row_stride)?)
}

/// Room and frames for a whole request.
pub fn build_session(request: &AnalyzeRequest) -> Result<(RoomModel, Vec<DepthFrame>), ApiError> {
    let room = build_room(&request.room)?;
    let frames = request
        .photos
        .iter()
        .enumerate()
        .map(|(index, photo)| build_frame(index, photo))
        .collect::<Result<Vec<_>, ApiError>>()?;
    Ok((room, frames))
}

/// Analysis configuration for a request.
///
/// Requests whose photos all carry inline detections make no vision calls,
/// so the inter-call delay is dropped for them.
pub fn analysis_config(
    defaults: AnalysisConfig,
    options: &AnalysisOptions,
    photos: &[PhotoPayload],
) -> AnalysisConfig {
    let mut config = defaults;
    if let Some(min_confidence) = options.min_confidence {
        config.min_confidence = min_confidence;
    }
    if let Some(depth) = options.depth {
        config.depth = depth;
    }
    if let Some(dedup) = options.dedup {
        config.dedup = dedup;
    }
    if photos.iter().all(|p| p.detections.is_some()) {
        config.inter_call_delay_ms = 0;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SurfacePayload;

    fn identity() -> Vec<f64> {
        Matrix4::<f64>::identity().as_slice().to_vec()
    }

    fn photo() -> PhotoPayload {
        PhotoPayload {
            image_width: 640,
            image_height: 480,
            pose: None,
            intrinsics: None,
            depth: None,
            image: None,
            detections: Some(Vec::new()),
        }
    }

    #[test]
    fn test_room_from_payload() {
        let room = build_room(&RoomPayload {
            surfaces: vec![SurfacePayload {
                id: "w1".into(),
                category: "Wall".into(),
                transform: identity(),
                width: 4.0,
                height: 2.5,
            }],
            ceiling_height: 2.5,
        })
        .unwrap();
        assert_eq!(room.wall_count(), 1);
        assert_eq!(room.label("w1"), Some("Wall A"));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let result = build_room(&RoomPayload {
            surfaces: vec![SurfacePayload {
                id: "x".into(),
                category: "staircase".into(),
                transform: identity(),
                width: 1.0,
                height: 1.0,
            }],
            ceiling_height: 2.5,
        });
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_frame_decoding() {
        let values = [1.0f32, 2.0, 3.0, 4.0];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();

        let mut payload = photo();
        payload.depth = Some(DepthPayload {
            width: 2,
            height: 2,
            row_stride: None,
            data: STANDARD.encode(bytes),
        });
        payload.intrinsics = Some([[500.0, 0.0, 320.0], [0.0, 510.0, 240.0], [0.0, 0.0, 1.0]]);

        let frame = build_frame(0, &payload).unwrap();
        let (buffer, intrinsics) = frame.depth_parts().unwrap();
        assert_eq!(buffer.read(1, 1), Some(4.0));
        assert_eq!(intrinsics.fy, 510.0);
        assert_eq!(intrinsics.cx, 320.0);
        assert!(frame.usable_pose().is_none());
    }

    #[test]
    fn test_bad_depth_rejected() {
        let mut payload = photo();
        payload.depth = Some(DepthPayload {
            width: 4,
            height: 4,
            row_stride: None,
            data: STANDARD.encode([0u8; 8]),
        });
        assert!(matches!(build_frame(0, &payload), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_inline_detections_skip_delay() {
        let defaults = AnalysisConfig::default();
        let config = analysis_config(defaults.clone(), &AnalysisOptions::default(), &[photo()]);
        assert_eq!(config.inter_call_delay_ms, 0);

        let mut remote = photo();
        remote.detections = None;
        let config = analysis_config(defaults, &AnalysisOptions::default(), &[photo(), remote]);
        assert_eq!(config.inter_call_delay_ms, 500);
    }
}
