use anyhow::Result;
use image::{Rgb, RgbImage};
use tokio_util::sync::CancellationToken;

use video_moderator::perception::{Caption, Captioner, Frame, PerceptionServices, PoseEstimator};
use video_moderator::sampling::SampledClip;
use video_moderator::signals::PoseSignals;
use video_moderator::{
    Decision, ModerationEngine, ModeratorConfig, PolicyKind, SignalBundle, VideoAnalyzer,
};

struct FixedCaption(&'static str);

impl Captioner for FixedCaption {
    fn caption(&self, _frame: &Frame) -> Result<Caption> {
        Ok(Caption::new(self.0, 0.9))
    }
}

struct PersonAtCounter;

impl PoseEstimator for PersonAtCounter {
    fn estimate(&self, _frame: &Frame) -> Result<PoseSignals> {
        Ok(PoseSignals {
            human_present: true,
            hands_detected: true,
            ..PoseSignals::default()
        })
    }
}

fn gray_frames(values: &[u8]) -> SampledClip {
    SampledClip::from_frames(
        values
            .iter()
            .map(|v| RgbImage::from_pixel(64, 48, Rgb([*v, *v, *v])))
            .collect(),
    )
}

fn analyzer(services: PerceptionServices) -> VideoAnalyzer {
    VideoAnalyzer::new(ModeratorConfig::default(), services, ModerationEngine::default())
}

#[test]
fn partial_bundle_document_is_scored() {
    let bundle: SignalBundle = serde_json::from_str(
        r#"{
            "human": {"human_present": true},
            "entity": {"weapon_present": true},
            "motion": {"motion_score": 40.0, "aggressive_motion": true},
            "scene_labels": [{"caption": "a man attacks another man", "score": 0.9}]
        }"#,
    )
    .unwrap();

    let verdict = ModerationEngine::default().decide(&bundle);
    assert_eq!(verdict.decision, Decision::Unsafe);
    assert_eq!(verdict.explanation.category, Some(PolicyKind::Violence));
    assert_eq!(verdict.explanation.max_risk, 0.9);
}

#[test]
fn empty_document_is_safe() {
    let bundle: SignalBundle = serde_json::from_str("{}").unwrap();
    let verdict = ModerationEngine::default().decide(&bundle);
    assert_eq!(verdict.decision, Decision::Safe);
    assert_eq!(verdict.explanation.category, None);
    assert_eq!(
        verdict.explanation.reasons,
        vec!["No harmful signals detected".to_string()]
    );
}

#[tokio::test]
async fn armed_attack_clip_is_unsafe() {
    let services = PerceptionServices::default()
        .with_captioner(FixedCaption("a man with a gun attacks another man"));
    let clip = gray_frames(&[20, 120, 20, 120, 20, 120]);

    let report = analyzer(services)
        .analyze_frames(&clip, &CancellationToken::new())
        .await;

    assert_eq!(report.frames_sampled, 6);
    assert!(report.fast_filter.suspicious);
    assert!(report.signals.entity.weapon_present);
    assert!(report.signals.temporal.sustained);
    assert_eq!(report.decision, Decision::Unsafe);
    assert_eq!(report.explanation.category, Some(PolicyKind::Violence));
}

#[tokio::test]
async fn cooking_clip_is_safe() {
    let services = PerceptionServices::default()
        .with_pose(PersonAtCounter)
        .with_captioner(FixedCaption("a chef cutting tomatoes in a kitchen"));
    let clip = gray_frames(&[100, 102, 100, 102, 100]);

    let report = analyzer(services)
        .analyze_frames(&clip, &CancellationToken::new())
        .await;

    assert!(report.signals.human.human_present);
    assert!(report.signals.entity.knife_present);
    assert!(report.signals.entity.food_present);
    assert!(report.signals.scene.kitchen);
    assert_eq!(report.decision, Decision::Safe);
    for (kind, result) in report.risks.iter() {
        assert!(result.score < 0.2, "{} scored {}", kind, result.score);
    }
}

#[tokio::test]
async fn empty_clip_is_safe() {
    let report = analyzer(PerceptionServices::default())
        .analyze_frames(&SampledClip::from_frames(Vec::new()), &CancellationToken::new())
        .await;

    assert_eq!(report.frames_sampled, 0);
    assert_eq!(report.decision, Decision::Safe);
    assert_eq!(report.intent_score, 0.0);
}

#[tokio::test]
async fn report_serializes_to_json() {
    let report = analyzer(PerceptionServices::default())
        .analyze_frames(&gray_frames(&[90, 90]), &CancellationToken::new())
        .await;

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["decision"], "SAFE");
    assert!(json["run_id"].is_string());
    assert!(json["risks"]["fire_safety"]["score"].is_number());
    let stages: Vec<_> = json["timings"]["stages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|stage| stage["stage"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        stages,
        ["fast_filter", "perception", "captioning", "audio", "signals", "policies"]
    );
}

#[tokio::test]
async fn cancelled_run_still_decides() {
    let services = PerceptionServices::default()
        .with_captioner(FixedCaption("a man with a gun attacks another man"));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = analyzer(services)
        .analyze_frames(&gray_frames(&[10, 10, 10]), &cancel)
        .await;

    assert!(report.signals.scene_labels.is_empty());
    assert_eq!(report.decision, Decision::Safe);
}

#[tokio::test]
async fn missing_video_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = VideoAnalyzer::with_defaults(ModeratorConfig::default())
        .analyze(&dir.path().join("absent.mp4"), &CancellationToken::new())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn still_image_is_analysed_as_one_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    RgbImage::from_pixel(40, 30, Rgb([200, 200, 200]))
        .save(&path)
        .unwrap();

    let report = VideoAnalyzer::with_defaults(ModeratorConfig::default())
        .analyze(&path, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.frames_sampled, 1);
    assert_eq!(report.source.as_deref(), Some(path.as_path()));
    assert_eq!(report.decision, Decision::Safe);
}
