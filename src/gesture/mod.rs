//! Turns hand-classifier frames from the camera page into [`Command`]s.
//!
//! # Labels and landmarks
//!
//! The camera page runs a gesture classifier and forwards each result as a
//! `gesture_frame` command.  Every hand carries an optional category label,
//! its score and 21 normalized landmarks:
//!
//! | Index | Landmark            |
//! |-------|---------------------|
//! | 0     | wrist               |
//! | 9     | middle finger MCP   |
//! | 8     | index finger tip    |
//! | 12    | middle finger tip   |
//! | 16    | ring finger tip     |
//! | 20    | pinky tip           |
//!
//! With [`GestureSource::Labels`] the classifier's label is used when its
//! score clears [`GestureConfig::score_threshold`].  With
//! [`GestureSource::Landmarks`] the label comes from [`classify_pose`] and
//! a horizontal wave of the wrist also clears chaos.
//!
//! # Transitions
//!
//! Only the first hand is looked at.  The last accepted label is the
//! *stable* label; commands fire on edges between stable labels:
//!
//! | Stable      | New label     | Commands                                  |
//! |-------------|---------------|-------------------------------------------|
//! | `Open_Palm` | `Closed_Fist` | `CLEAR_CHAOS` (gesture)                   |
//! | not thumb   | `Thumb_Up`    | `set_mode` useful, then `organize_windows`|
//! | any         | `Pointing_Up` | `update_finger_position` on every frame   |

use crate::command::{Command, GestureFrame, HandResult, Landmark, Mode, Trigger};
use log::debug;
use serde::{Deserialize, Serialize};

const WRIST: usize = 0;
const MIDDLE_MCP: usize = 9;
const INDEX_TIP: usize = 8;
const FINGER_TIPS: [usize; 4] = [8, 12, 16, 20];
const HAND_LANDMARKS: usize = 21;

/// Where the label of a hand comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureSource {
    /// Trust the classifier's category label.
    #[default]
    Labels,
    /// Derive the label from landmark geometry, and detect waves.
    Landmarks,
}

/// Tuning knobs for gesture recognition.
///
/// `extend_ratio` and `curl_ratio` are multiples of the palm size (wrist to
/// middle-finger MCP).  A finger whose tip is farther from the wrist than
/// `extend_ratio · palm` is extended; nearer than `curl_ratio · palm` is
/// curled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Default: `labels`.
    pub source: GestureSource,
    /// Minimum classifier score for a label to count.  Default: `0.5`.
    pub score_threshold: f64,
    /// Wrist travel between frames, in normalized width, that counts as a
    /// wave.  Default: `0.25`.
    pub wave_threshold: f64,
    /// Minimum time between two waves.  Default: `2000`.
    pub wave_cooldown_ms: f64,
    /// Default: `1.6`.
    pub extend_ratio: f64,
    /// Default: `1.2`.
    pub curl_ratio: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            source: GestureSource::Labels,
            score_threshold: 0.5,
            wave_threshold: 0.25,
            wave_cooldown_ms: 2000.0,
            extend_ratio: 1.6,
            curl_ratio: 1.2,
        }
    }
}

/// Classifier categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureLabel {
    /// The classifier's "no gesture" sentinel.
    None,
    ClosedFist,
    OpenPalm,
    PointingUp,
    ThumbUp,
    ThumbDown,
    Victory,
    ILoveYou,
}

impl GestureLabel {
    /// Parse a classifier category name.  Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "None" => Self::None,
            "Closed_Fist" => Self::ClosedFist,
            "Open_Palm" => Self::OpenPalm,
            "Pointing_Up" => Self::PointingUp,
            "Thumb_Up" => Self::ThumbUp,
            "Thumb_Down" => Self::ThumbDown,
            "Victory" => Self::Victory,
            "ILoveYou" => Self::ILoveYou,
            _ => return None,
        })
    }
}

fn distance(a: &Landmark, b: &Landmark) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Classify a hand from its 21 landmarks.
///
/// All four fingers curled is a fist, all four extended an open palm.
/// Anything else, including a hand with missing landmarks, is unknown.
pub fn classify_pose(landmarks: &[Landmark], config: &GestureConfig) -> Option<GestureLabel> {
    if landmarks.len() < HAND_LANDMARKS {
        return None;
    }
    let wrist = &landmarks[WRIST];
    let palm = distance(wrist, &landmarks[MIDDLE_MCP]);
    if palm <= f64::EPSILON {
        return None;
    }
    let reach: Vec<f64> = FINGER_TIPS
        .iter()
        .map(|&tip| distance(wrist, &landmarks[tip]) / palm)
        .collect();
    if reach.iter().all(|r| *r < config.curl_ratio) {
        Some(GestureLabel::ClosedFist)
    } else if reach.iter().all(|r| *r > config.extend_ratio) {
        Some(GestureLabel::OpenPalm)
    } else {
        None
    }
}

/// Edge detector over classifier frames.
#[derive(Debug)]
pub struct GestureStateMachine {
    config: GestureConfig,
    stable: Option<GestureLabel>,
    last_wrist_x: Option<f64>,
    last_wave_ms: Option<f64>,
}

impl GestureStateMachine {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            stable: None,
            last_wrist_x: None,
            last_wave_ms: None,
        }
    }

    /// The last accepted label.
    pub fn stable(&self) -> Option<GestureLabel> {
        self.stable
    }

    /// Feed one frame; returns the commands it triggers, in order.
    pub fn process(&mut self, frame: &GestureFrame) -> Vec<Command> {
        let mut commands = Vec::new();
        let Some(hand) = frame.hands.first() else {
            self.last_wrist_x = None;
            return commands;
        };

        if self.config.source == GestureSource::Landmarks {
            if let Some(cmd) = self.detect_wave(frame.timestamp_ms, hand) {
                commands.push(cmd);
            }
        }

        let Some(label) = self.label_of(hand) else {
            return commands;
        };
        if label == GestureLabel::None {
            return commands;
        }

        match (self.stable, label) {
            (Some(GestureLabel::OpenPalm), GestureLabel::ClosedFist) => {
                debug!("open palm closed into a fist");
                commands.push(Command::ClearChaos {
                    trigger: Trigger::Gesture,
                });
            }
            (prev, GestureLabel::ThumbUp) if prev != Some(GestureLabel::ThumbUp) => {
                debug!("thumb up");
                commands.push(Command::SetMode { mode: Mode::Useful });
                commands.push(Command::OrganizeWindows);
            }
            (_, GestureLabel::PointingUp) => {
                if let Some(tip) = hand.landmarks.get(INDEX_TIP) {
                    commands.push(Command::UpdateFingerPosition { x: tip.x, y: tip.y });
                }
            }
            _ => {}
        }
        self.stable = Some(label);
        commands
    }

    fn label_of(&self, hand: &HandResult) -> Option<GestureLabel> {
        match self.config.source {
            GestureSource::Labels => {
                if hand.score <= self.config.score_threshold {
                    return None;
                }
                hand.label.as_deref().and_then(GestureLabel::from_name)
            }
            GestureSource::Landmarks => classify_pose(&hand.landmarks, &self.config),
        }
    }

    fn detect_wave(&mut self, now_ms: f64, hand: &HandResult) -> Option<Command> {
        let x = hand.landmarks.get(WRIST)?.x;
        let previous = self.last_wrist_x.replace(x)?;
        if (x - previous).abs() <= self.config.wave_threshold {
            return None;
        }
        if let Some(last) = self.last_wave_ms {
            if now_ms - last < self.config.wave_cooldown_ms {
                debug!("wave ignored, still cooling down");
                return None;
            }
        }
        debug!("wave detected ({:.2} → {:.2})", previous, x);
        self.last_wave_ms = Some(now_ms);
        Some(Command::ClearChaos {
            trigger: Trigger::Gesture,
        })
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn labelled(ts: f64, label: &str, score: f64) -> GestureFrame {
        GestureFrame {
            timestamp_ms: ts,
            hands: vec![HandResult {
                label: Some(label.to_string()),
                score,
                landmarks: (0..21).map(|i| Landmark { x: i as f64 / 100.0, y: 0.3 }).collect(),
            }],
        }
    }

    /// Hand with the wrist at `(wrist_x, 0.9)`, palm size 0.2, and every
    /// fingertip either curled (0.1 from the wrist) or extended (0.4).
    fn hand(wrist_x: f64, extended: bool) -> Vec<Landmark> {
        let mut lm = vec![Landmark { x: wrist_x, y: 0.9 }; 21];
        lm[MIDDLE_MCP] = Landmark { x: wrist_x, y: 0.7 };
        let reach = if extended { 0.4 } else { 0.1 };
        for tip in FINGER_TIPS {
            lm[tip] = Landmark { x: wrist_x, y: 0.9 - reach };
        }
        lm
    }

    fn landmark_frame(ts: f64, landmarks: Vec<Landmark>) -> GestureFrame {
        GestureFrame {
            timestamp_ms: ts,
            hands: vec![HandResult {
                label: None,
                score: 0.9,
                landmarks,
            }],
        }
    }

    fn landmark_machine() -> GestureStateMachine {
        GestureStateMachine::new(GestureConfig {
            source: GestureSource::Landmarks,
            ..GestureConfig::default()
        })
    }

    fn clear() -> Command {
        Command::ClearChaos {
            trigger: Trigger::Gesture,
        }
    }

    #[test]
    fn palm_then_fist_clears_once() {
        let mut gsm = GestureStateMachine::new(GestureConfig::default());
        assert!(gsm.process(&labelled(0.0, "Open_Palm", 0.9)).is_empty());
        assert_eq!(gsm.process(&labelled(33.0, "Closed_Fist", 0.8)), vec![clear()]);
        assert!(gsm.process(&labelled(66.0, "Closed_Fist", 0.8)).is_empty());
        assert_eq!(gsm.stable(), Some(GestureLabel::ClosedFist));
    }

    #[test]
    fn fist_without_palm_does_nothing() {
        let mut gsm = GestureStateMachine::new(GestureConfig::default());
        assert!(gsm.process(&labelled(0.0, "Victory", 0.9)).is_empty());
        assert!(gsm.process(&labelled(1.0, "Closed_Fist", 0.9)).is_empty());
    }

    #[test]
    fn thumb_up_switches_to_useful_and_organizes() {
        let mut gsm = GestureStateMachine::new(GestureConfig::default());
        let cmds = gsm.process(&labelled(0.0, "Thumb_Up", 0.7));
        assert_eq!(
            cmds,
            vec![Command::SetMode { mode: Mode::Useful }, Command::OrganizeWindows]
        );
        assert!(gsm.process(&labelled(1.0, "Thumb_Up", 0.7)).is_empty());
    }

    #[test]
    fn pointing_emits_every_frame() {
        let mut gsm = GestureStateMachine::new(GestureConfig::default());
        for ts in 0..3 {
            let cmds = gsm.process(&labelled(ts as f64, "Pointing_Up", 0.9));
            assert_eq!(cmds, vec![Command::UpdateFingerPosition { x: 0.08, y: 0.3 }]);
        }
    }

    #[test]
    fn low_score_frames_leave_stable_label() {
        let mut gsm = GestureStateMachine::new(GestureConfig::default());
        gsm.process(&labelled(0.0, "Open_Palm", 0.9));
        assert!(gsm.process(&labelled(1.0, "Victory", 0.5)).is_empty());
        assert_eq!(gsm.stable(), Some(GestureLabel::OpenPalm));
        assert_eq!(gsm.process(&labelled(2.0, "Closed_Fist", 0.51)), vec![clear()]);
    }

    #[test]
    fn none_sentinel_and_unknown_labels_are_ignored() {
        let mut gsm = GestureStateMachine::new(GestureConfig::default());
        gsm.process(&labelled(0.0, "Open_Palm", 0.9));
        gsm.process(&labelled(1.0, "None", 0.99));
        gsm.process(&labelled(2.0, "Jazz_Hands", 0.99));
        assert_eq!(gsm.stable(), Some(GestureLabel::OpenPalm));
    }

    #[test]
    fn only_first_hand_counts() {
        let mut gsm = GestureStateMachine::new(GestureConfig::default());
        let mut frame = labelled(0.0, "Victory", 0.9);
        frame.hands.push(labelled(0.0, "Thumb_Up", 0.9).hands.remove(0));
        assert!(gsm.process(&frame).is_empty());
    }

    #[test]
    fn empty_frames_are_ignored() {
        let mut gsm = GestureStateMachine::new(GestureConfig::default());
        let frame = GestureFrame {
            timestamp_ms: 0.0,
            hands: vec![],
        };
        assert!(gsm.process(&frame).is_empty());
        assert_eq!(gsm.stable(), None);
    }

    #[test]
    fn classify_pose_by_finger_reach() {
        let cfg = GestureConfig::default();
        assert_eq!(classify_pose(&hand(0.5, true), &cfg), Some(GestureLabel::OpenPalm));
        assert_eq!(classify_pose(&hand(0.5, false), &cfg), Some(GestureLabel::ClosedFist));

        let mut mixed = hand(0.5, true);
        mixed[16] = Landmark { x: 0.5, y: 0.8 };
        assert_eq!(classify_pose(&mixed, &cfg), None);

        assert_eq!(classify_pose(&hand(0.5, true)[..20], &cfg), None);
    }

    #[test]
    fn landmark_palm_then_fist_clears() {
        let mut gsm = landmark_machine();
        assert!(gsm.process(&landmark_frame(0.0, hand(0.5, true))).is_empty());
        assert_eq!(gsm.process(&landmark_frame(33.0, hand(0.5, false))), vec![clear()]);
    }

    #[test]
    fn wave_clears_with_cooldown() {
        let mut gsm = landmark_machine();
        assert!(gsm.process(&landmark_frame(0.0, hand(0.2, false))).is_empty());
        assert_eq!(gsm.process(&landmark_frame(100.0, hand(0.6, false))), vec![clear()]);
        // Within the cooldown.
        assert!(gsm.process(&landmark_frame(600.0, hand(0.2, false))).is_empty());
        // Small movement never counts.
        assert!(gsm.process(&landmark_frame(2500.0, hand(0.3, false))).is_empty());
        assert_eq!(gsm.process(&landmark_frame(2600.0, hand(0.7, false))), vec![clear()]);
    }

    #[test]
    fn label_mode_does_not_detect_waves() {
        let mut gsm = GestureStateMachine::new(GestureConfig::default());
        assert!(gsm.process(&landmark_frame(0.0, hand(0.1, false))).is_empty());
        assert!(gsm.process(&landmark_frame(100.0, hand(0.9, false))).is_empty());
    }
}
