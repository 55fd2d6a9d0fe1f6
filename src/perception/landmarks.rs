use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{Frame, PoseEstimator};
use crate::signals::PoseSignals;

/// A keypoint in normalised image coordinates; `y` grows downwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
}

impl Keypoint {
    pub fn new(x: f64, y: f64) -> Self {
        Keypoint { x, y }
    }
}

/// The upper-body keypoints the pose booleans are derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseLandmarks {
    pub nose: Keypoint,
    pub left_shoulder: Keypoint,
    pub right_shoulder: Keypoint,
    pub left_wrist: Keypoint,
    pub right_wrist: Keypoint,
}

impl PoseLandmarks {
    /// A detected skeleton always means a person with visible hands. Each
    /// flag holds when either wrist is above the matching reference point.
    pub fn to_signals(&self) -> PoseSignals {
        let wrists = [self.left_wrist.y, self.right_wrist.y];
        let above = |level: f64| wrists.iter().any(|y| *y < level);
        let chest = (self.left_shoulder.y + self.right_shoulder.y) / 2.0;

        PoseSignals {
            human_present: true,
            hands_detected: true,
            hands_near_face: above(self.nose.y),
            hands_near_chest: above(chest),
            raised_arms: self.left_wrist.y < self.left_shoulder.y
                || self.right_wrist.y < self.right_shoulder.y,
        }
    }
}

/// Skeleton model that reports raw keypoints, or `None` when nobody is in
/// shot.
pub trait LandmarkModel: Send + Sync {
    fn landmarks(&self, frame: &Frame) -> Result<Option<PoseLandmarks>>;
}

/// Pose estimator backed by a keypoint model.
#[derive(Debug, Clone)]
pub struct LandmarkPose<M> {
    model: M,
}

impl<M: LandmarkModel> LandmarkPose<M> {
    pub fn new(model: M) -> Self {
        LandmarkPose { model }
    }
}

impl<M: LandmarkModel> PoseEstimator for LandmarkPose<M> {
    fn estimate(&self, frame: &Frame) -> Result<PoseSignals> {
        Ok(self
            .model
            .landmarks(frame)?
            .map(|landmarks| landmarks.to_signals())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn standing() -> PoseLandmarks {
        PoseLandmarks {
            nose: Keypoint::new(0.5, 0.2),
            left_shoulder: Keypoint::new(0.4, 0.35),
            right_shoulder: Keypoint::new(0.6, 0.35),
            left_wrist: Keypoint::new(0.35, 0.7),
            right_wrist: Keypoint::new(0.65, 0.7),
        }
    }

    #[test]
    fn arms_down_is_only_presence() {
        assert_eq!(
            standing().to_signals(),
            PoseSignals {
                human_present: true,
                hands_detected: true,
                ..PoseSignals::default()
            }
        );
    }

    #[test]
    fn wrist_above_nose_sets_every_flag() {
        let mut landmarks = standing();
        landmarks.right_wrist = Keypoint::new(0.55, 0.1);

        let pose = landmarks.to_signals();
        assert!(pose.hands_near_face);
        assert!(pose.hands_near_chest);
        assert!(pose.raised_arms);
    }

    #[test]
    fn chest_uses_the_shoulder_midpoint() {
        let mut landmarks = standing();
        landmarks.left_shoulder.y = 0.3;
        landmarks.right_shoulder.y = 0.5;
        // Below the left shoulder, above the 0.4 midpoint and the right shoulder.
        landmarks.right_wrist = Keypoint::new(0.6, 0.38);

        let pose = landmarks.to_signals();
        assert!(pose.hands_near_chest);
        assert!(pose.raised_arms);
        assert!(!pose.hands_near_face);
    }

    struct Scripted(Option<PoseLandmarks>);

    impl LandmarkModel for Scripted {
        fn landmarks(&self, _frame: &Frame) -> Result<Option<PoseLandmarks>> {
            Ok(self.0)
        }
    }

    #[test]
    fn empty_frame_has_no_pose() {
        let frame = Frame::new(0, RgbImage::new(4, 4));
        let pose = LandmarkPose::new(Scripted(None)).estimate(&frame).unwrap();
        assert_eq!(pose, PoseSignals::default());

        let pose = LandmarkPose::new(Scripted(Some(standing())))
            .estimate(&frame)
            .unwrap();
        assert!(pose.human_present);
    }
}
