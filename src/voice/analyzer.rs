//! Rule-based emotion analysis for spoken lines.
//!
//! Three weighted pattern tables score a line: the emotion picks the base
//! preset, then urgency and the sentence ending nudge it. Results are
//! clamped to a range the engine renders naturally.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::VoicePreset;

/// Scores at or below this fall back to the neutral category.
const MIN_SCORE: f64 = 0.3;

/// Prosody written into an engine audio query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prosody {
    pub pitch_scale: f64,
    pub speed_scale: f64,
    pub intonation_scale: f64,
    pub volume_scale: f64,
}

impl From<VoicePreset> for Prosody {
    fn from(preset: VoicePreset) -> Self {
        Self {
            pitch_scale: preset.pitch,
            speed_scale: preset.speed,
            intonation_scale: preset.intonation,
            volume_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub emotion: &'static str,
    pub parameters: Prosody,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Urgency {
    Emergency,
    Warning,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Question,
    Command,
    Exclamation,
    Plain,
}

struct Rule {
    regex: Regex,
    weight: f64,
}

fn compile(defs: &[(&str, f64)]) -> Vec<Rule> {
    defs.iter()
        .map(|&(pattern, weight)| Rule {
            regex: Regex::new(pattern)
                .unwrap_or_else(|e| panic!("BUG: invalid built-in pattern '{pattern}': {e}")),
            weight,
        })
        .collect()
}

fn score(rules: &[Rule], text: &str) -> f64 {
    rules
        .iter()
        .filter(|rule| rule.regex.is_match(text))
        .map(|rule| rule.weight)
        .sum()
}

/// Highest-scoring category, or `None` when nothing clears `MIN_SCORE`.
/// Ties go to the earlier table.
fn best<T: Copy>(tables: &[(T, Vec<Rule>)], text: &str) -> Option<(T, f64)> {
    let mut winner: Option<(T, f64)> = None;
    for (category, rules) in tables {
        let total = score(rules, text);
        if total > MIN_SCORE && winner.map_or(true, |(_, top)| total > top) {
            winner = Some((*category, total));
        }
    }
    winner.map(|(category, total)| (category, total.min(1.0)))
}

static EMOTIONS: Lazy<Vec<(&'static str, Vec<Rule>)>> = Lazy::new(|| {
    vec![
        (
            "happy",
            compile(&[
                (r"(?i)congrat|おめでと", 1.0),
                (r"(?i)amazing!|すごい[!！]", 1.0),
                (r"(?i)you did it|やりました", 0.8),
                (r"(?i)success|成功", 0.8),
                (r"(?i)wonderful|素晴らしい", 0.9),
                (r"(?i)level up|レベルアップ", 1.0),
                (r"♪", 0.5),
                (r"[!！]{2,}", 0.7),
            ]),
        ),
        (
            "worried",
            compile(&[
                (r"(?i)danger|危険", 0.9),
                (r"(?i)be careful|気をつけて", 0.8),
                (r"(?i)caution|注意", 0.8),
                (r"(?i)warning|警告", 0.9),
                (r"(?i)\b[2-4] zombies|ゾンビ.*[2-4]体", 1.0),
                (r"(?i)health is low|体力が(少な|危険)", 0.9),
                (r"(?i)heal|回復", 0.7),
                (r"\.{3}|…", 0.5),
            ]),
        ),
        (
            "surprised",
            compile(&[
                (r"[!！]{3,}", 1.0),
                (r"(?i)hurry|right now|急いで|すぐに", 0.9),
                (r"(?i)emergency|緊急", 1.0),
                (r"(?i)\b([5-9]|\d{2,}) zombies|ゾンビ.*5体以上", 1.0),
                (r"(?i)zombies? approaching|ゾンビ.*接近", 0.8),
                (r"(?i)danger.*!|危険.*[!！]", 0.9),
                (r"(?i)run away|get out|逃げて", 0.9),
            ]),
        ),
        (
            "gentle",
            compile(&[
                (r"(?i)let'?s do our best|頑張りましょう", 0.8),
                (r"(?i)good work|お疲れ様", 0.7),
                (r"(?i)take a (rest|break)|ゆっくり休んで", 0.7),
                (r"です(ね|よ)♪*$", 0.6),
                (r"♪+", 0.5),
            ]),
        ),
        (
            "sleepy",
            compile(&[
                (r"(?i)sleepy|眠い|むにゃ", 1.0),
                (r"(?i)good morning.*\.{3}|おはよう.*\.{3}", 0.8),
                (r"\.{3,}|…{2,}", 0.7),
                (r"(?i)zzz", 1.0),
                (r"(?i)yawn|ふわぁ", 0.9),
            ]),
        ),
    ]
});

static URGENCY: Lazy<Vec<(Urgency, Vec<Rule>)>> = Lazy::new(|| {
    vec![
        (
            Urgency::Emergency,
            compile(&[
                (r"(?i)hurry|right now|emergency|danger|すぐに|急いで|緊急|危険|[!！]{3,}", 0.9),
                (r"(?i)\b([5-9]|\d{2,}) zombies|ゾンビ.*5体以上", 1.0),
                (r"(?i)run away!|逃げて[!！]", 1.0),
            ]),
        ),
        (
            Urgency::Warning,
            compile(&[
                (r"(?i)caution|warning|be careful|\b[2-4] zombies|注意|警告|気をつけて|ゾンビ.*[2-4]体", 0.8),
                (r"(?i)health.*(low|danger)|体力.*危険", 0.8),
            ]),
        ),
        (
            Urgency::Normal,
            compile(&[
                (r"(?i)good morning|do our best|おはよう|頑張|です(ね|よ)", 0.7),
                (r"♪", 0.6),
            ]),
        ),
    ]
});

static ENDINGS: Lazy<Vec<(Ending, Vec<Rule>)>> = Lazy::new(|| {
    vec![
        (
            Ending::Question,
            compile(&[
                (r"[?？]$", 0.9),
                (r"(ですか|かな|かしら|ましょうか)$", 0.8),
            ]),
        ),
        (
            Ending::Command,
            compile(&[
                (r"(?i)^(please|hurry|run|get|stop|take)\b", 0.9),
                (r"(てください|なさい|ください|すべき)[!！]*$", 0.9),
            ]),
        ),
        (Ending::Exclamation, compile(&[(r"[!！]+$", 0.9)])),
    ]
});

/// Choose prosody for `text`.
///
/// `preset` resolves an emotion name to its configured base preset.
pub fn analyze<F>(text: &str, preset: F) -> Analysis
where
    F: Fn(&str) -> VoicePreset,
{
    let text = text.trim();
    let (emotion, _) = best(&EMOTIONS, text).unwrap_or(("normal", 0.5));
    let (urgency, urgency_score) = best(&URGENCY, text).unwrap_or((Urgency::Normal, 0.5));
    let (ending, ending_score) = best(&ENDINGS, text).unwrap_or((Ending::Plain, 0.5));

    let mut p = Prosody::from(preset(emotion));
    p.volume_scale = match emotion {
        "surprised" => 1.05,
        "sleepy" => 0.9,
        _ => 1.0,
    };

    match urgency {
        Urgency::Emergency => {
            p.speed_scale += 0.1 * urgency_score;
            p.intonation_scale += 0.2 * urgency_score;
            p.volume_scale += 0.05 * urgency_score;
        }
        Urgency::Warning => {
            p.speed_scale += 0.05 * urgency_score;
            p.pitch_scale -= 0.02 * urgency_score;
        }
        Urgency::Normal => {}
    }

    match ending {
        Ending::Question => {
            p.pitch_scale += 0.03 * ending_score;
            p.intonation_scale += 0.1 * ending_score;
        }
        Ending::Command => {
            p.speed_scale += 0.05 * ending_score;
            p.intonation_scale += 0.15 * ending_score;
        }
        Ending::Exclamation => {
            p.pitch_scale += 0.04 * ending_score;
            p.intonation_scale += 0.2 * ending_score;
        }
        Ending::Plain => {}
    }

    p.pitch_scale = p.pitch_scale.clamp(-0.15, 0.15);
    p.speed_scale = p.speed_scale.clamp(0.8, 1.1);
    p.intonation_scale = p.intonation_scale.clamp(0.8, 1.4);
    p.volume_scale = p.volume_scale.clamp(0.9, 1.05);

    Analysis {
        emotion,
        parameters: p,
        explanation: explain(emotion, urgency, ending),
    }
}

fn explain(emotion: &str, urgency: Urgency, ending: Ending) -> String {
    let base = match emotion {
        "happy" => "Bright, positive line: higher pitch and a lively pace",
        "worried" => "Mild warning: slightly lower pitch and restrained intonation",
        "surprised" => "Urgent warning: high pitch, fast pace and strong intonation",
        "gentle" => "Encouragement: calm, lower pitch and an easy pace",
        "sleepy" => "Drowsy line: low pitch and a slow pace",
        _ => "Default settings for a neutral line",
    };

    let mut parts = vec![base];
    match urgency {
        Urgency::Emergency => parts.push("high urgency raises speed and emphasis"),
        Urgency::Warning => parts.push("needs attention, so moderately emphasized"),
        Urgency::Normal => {}
    }
    match ending {
        Ending::Question => parts.push("question ending lifts pitch and intonation"),
        Ending::Command => parts.push("instruction stresses speed and intonation"),
        Ending::Exclamation => parts.push("exclamation adds intonation"),
        Ending::Plain => {}
    }
    parts.join(". ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::VoiceConfig;

    fn run(text: &str) -> Analysis {
        let voice = VoiceConfig::default();
        analyze(text, |emotion| voice.preset(emotion))
    }

    #[test]
    fn test_plain_line_is_neutral() {
        let analysis = run("The meeting is at three");
        assert_eq!(analysis.emotion, "normal");
        assert_eq!(analysis.parameters, Prosody::from(VoicePreset::NEUTRAL));
        assert_eq!(analysis.explanation, "Default settings for a neutral line");
    }

    #[test]
    fn test_horde_warning_is_urgent_and_clamped() {
        let analysis = run("12 zombies approaching! Run away!!!");
        assert_eq!(analysis.emotion, "surprised");

        let p = analysis.parameters;
        assert_eq!(p.speed_scale, 1.1);
        assert_eq!(p.intonation_scale, 1.4);
        assert_eq!(p.volume_scale, 1.05);
        assert!(analysis.explanation.contains("high urgency"));
    }

    #[test]
    fn test_celebration_is_happy() {
        let analysis = run("Level up! Congratulations!!");
        assert_eq!(analysis.emotion, "happy");
        assert!(analysis.parameters.pitch_scale > 0.06);
        assert!(analysis.explanation.contains("exclamation"));
    }

    #[test]
    fn test_japanese_cues() {
        assert_eq!(run("むにゃ…おはようございます…").emotion, "sleepy");
        assert_eq!(run("今日もお仕事頑張りましょうね♪").emotion, "gentle");
    }

    #[test]
    fn test_question_lifts_pitch() {
        let analysis = run("Is the meeting at three?");
        assert!(analysis.parameters.pitch_scale > 0.0);
        assert!(analysis.explanation.contains("question"));
    }

    #[test]
    fn test_configured_preset_is_the_base() {
        let analysis = analyze("zzz", |_| VoicePreset {
            pitch: -0.1,
            intonation: 0.9,
            speed: 0.85,
        });
        assert_eq!(analysis.emotion, "sleepy");
        assert_eq!(analysis.parameters.speed_scale, 0.85);
        assert_eq!(analysis.parameters.volume_scale, 0.9);
    }
}
