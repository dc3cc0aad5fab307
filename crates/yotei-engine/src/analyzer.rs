//! Rule-based analysis of a Japanese task sentence.
//!
//! Extracts a start time, a duration, a category, and a clean noun-phrase
//! title from one raw sentence without any external AI call. Used both as a
//! last-resort analyzer and as a corrective pass over a probabilistically
//! produced [`TaskAnalysis`]: for explicit numeric/time mentions the
//! deterministic local parse is authoritative (see [`apply_fallback`]).
//!
//! The pipeline is an ordered sequence of stages. Each stage consumes its
//! matched substring from a working copy of the sentence so later stages
//! cannot re-match it:
//!
//! 1. day offset (明後日 before 明日)
//! 2. start time (午前/午後/夕方/夜 + hour + optional minutes or 半)
//! 3. end time (〜まで) folded into a duration when a start time exists
//! 4. explicit duration (N時間M分 / N分)
//! 5. category keywords, first matching family wins
//! 6. title segmentation (clause-final verb table → segment delimiter)
//! 7. description = the time-stripped residual sentence
//!
//! Everything is a pure function of the input string and the explicit `now`
//! anchor; identical input always produces identical output.
//!
//! The `regex` crate has no lookaround, so the "時 not followed by 間"
//! constraints are enforced as explicit checks on the text after each
//! candidate match instead of `(?!間)`.

use std::ops::Range;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::civil::{self, jst_instant_opt};

/// Duration assumed when the sentence states none.
pub const DEFAULT_DURATION_MINUTES: i64 = 30;

/// Task category, decided by the first matching keyword family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Work,
    Study,
    Exercise,
    Chore,
    Shopping,
    #[default]
    Other,
}

/// One analyzed task, ready for the scheduler.
///
/// Immutable once created; [`apply_fallback`] produces a corrected copy
/// rather than mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAnalysis {
    pub title: String,
    pub description: String,
    pub duration_minutes: i64,
    #[serde(with = "jst_instant_opt", default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(with = "jst_instant_opt", default)]
    pub preferred_start_time: Option<DateTime<Utc>>,
    pub category: TaskCategory,
}

/// Output of the local analyzer: the analysis plus whether the duration came
/// from explicit text rather than the default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackAnalysis {
    pub analysis: TaskAnalysis,
    pub duration_explicit: bool,
}

// ── Rule tables ─────────────────────────────────────────────────────────────

const EXERCISE_KEYWORDS: &[&str] = &[
    "トレーニング",
    "筋トレ",
    "運動",
    "ジム",
    "ランニング",
    "ジョギング",
    "ウォーキング",
    "ヨガ",
    "ストレッチ",
    "散歩",
];

const WORK_KEYWORDS: &[&str] = &[
    "仕事",
    "会議",
    "ミーティング",
    "打ち合わせ",
    "商談",
    "面談",
    "資料",
    "プレゼン",
    "メール",
    "報告",
];

const STUDY_KEYWORDS: &[&str] = &[
    "勉強",
    "学習",
    "宿題",
    "講義",
    "授業",
    "復習",
    "予習",
    "読書",
    "論文",
    "試験",
];

const CHORE_KEYWORDS: &[&str] = &[
    "掃除",
    "洗濯",
    "料理",
    "片付け",
    "皿洗い",
    "ゴミ出し",
    "アイロン",
];

const SHOPPING_KEYWORDS: &[&str] = &["買い物", "買い出し", "ショッピング", "スーパー", "購入"];

/// Hesitations and softeners that carry no task content.
const FILLER_WORDS: &[&str] = &[
    "ちょっと",
    "やっぱり",
    "やはり",
    "とりあえず",
    "えっと",
    "ええと",
    "あのー",
    "うーん",
    "なんか",
    "まあ",
];

/// Connector phrases normalized to the segment delimiter before the verb
/// table runs.
const PRE_CONNECTIVES: &[&str] = &["その後", "そのあと", "、", "。"];

/// Clause-final verb and auxiliary patterns, replaced with the segment
/// delimiter. Ordered: longer and more specific forms must come before the
/// generic ます/です catch-alls or the catch-alls would swallow them and
/// leave stems like 向かい behind.
const CLAUSE_BREAK_PATTERNS: &[&str] = &[
    // volitional / intention
    "に行こうと思います",
    "しようと思います",
    "ようと思います",
    "と思います",
    "する予定です",
    "するつもりです",
    "つもりです",
    "したいです",
    "たいです",
    // motion verbs
    "に行きます",
    "へ行きます",
    "行きます",
    "に向かいます",
    "へ向かいます",
    "向かいます",
    // generic action verbs
    "をします",
    "をやります",
    "します",
    "やります",
    // common concrete verbs
    "を買います",
    "買います",
    "を読みます",
    "読みます",
    "を作ります",
    "作ります",
    "を書きます",
    "書きます",
    "を見ます",
    "見ます",
    "食べます",
    "飲みます",
    // copulas and bare polite endings, last
    "でした",
    "です",
    "ました",
    "ます",
];

/// Coordinating connectives, replaced after the verb table (それから must be
/// consumed as a word before the inter-kana か rule can see its inner か).
const COORDINATING_CONNECTIVES: &[&str] = &["それから", "または"];

/// Fragments stripped from segment ends until stable.
const TRAILING_REMNANTS: &[&str] = &[
    "します", "やります", "する", "やる", "した", "し", "に", "を", "は", "が", "で", "へ",
    "と", "の", "も", "から", "まで", "、", "。", "・",
];

/// Particles and punctuation stripped from segment starts until stable.
const LEADING_REMNANTS: &[&str] = &[
    "は", "が", "を", "に", "で", "へ", "と", "の", "も", "から", "まで", "、", "。", "・",
];

const SEGMENT_DELIMITER: char = '\n';

struct Patterns {
    /// Optional period-of-day prefix + 1-2 digit hour + 時.
    start_time: Regex,
    /// Minute clause immediately after an hour match.
    minute_suffix: Regex,
    /// Explicit end-of-activity time: NN時(半|MM分)?まで(に)?.
    end_time: Regex,
    /// N時間 optionally followed immediately by M分.
    hours_duration: Regex,
    /// Bare N分.
    minutes_duration: Regex,
    /// Inter-kana か meaning "or".
    or_between_kana: Regex,
    /// Motion prefix before the real task: 「…に行って買い物」.
    motion_prefix: Regex,
    /// Internal gerund て linking two multi-character kana runs.
    te_link: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        start_time: Regex::new(r"(午後|午前|夕方|夜)?([0-9]{1,2})時").expect("start_time regex"),
        minute_suffix: Regex::new(r"^([0-9]{1,2})分").expect("minute_suffix regex"),
        end_time: Regex::new(r"([0-9]{1,2})時(?:(半)|([0-9]{1,2})分)?まで(?:に)?")
            .expect("end_time regex"),
        hours_duration: Regex::new(r"([0-9]+)時間(?:([0-9]+)分)?").expect("hours_duration regex"),
        minutes_duration: Regex::new(r"([0-9]+)分").expect("minutes_duration regex"),
        or_between_kana: Regex::new(
            r"([\p{Hiragana}\p{Katakana}ー])か([\p{Hiragana}\p{Katakana}ー])",
        )
        .expect("or_between_kana regex"),
        motion_prefix: Regex::new(r"^.+?に行って").expect("motion_prefix regex"),
        te_link: Regex::new(
            r"([\p{Hiragana}\p{Katakana}\p{Han}ー]{2,})て([\p{Hiragana}\p{Katakana}\p{Han}ー]{2,})",
        )
        .expect("te_link regex"),
    })
}

// ── Public entry points ─────────────────────────────────────────────────────

/// Analyze one raw sentence against an explicit `now` anchor.
///
/// Never fails: malformed or ambiguous text yields weaker extraction
/// (default duration, category `other`, raw sentence as title) rather than
/// an error.
pub fn create_fallback_analysis(input: &str, now: DateTime<Utc>) -> FallbackAnalysis {
    let mut working = input.to_string();

    let day_offset = extract_day_offset(&mut working);
    let start_time = extract_start_time(&mut working);
    let end_duration = extract_end_duration(&mut working, start_time);
    let explicit_duration = extract_explicit_duration(&mut working);

    let preferred_start_time = start_time.map(|time| {
        let date = civil::local_date(now) + Duration::days(day_offset);
        civil::at_local(date, time)
    });

    // An explicit N時間/N分 mention overrides the まで-derived duration.
    let (duration_minutes, duration_explicit) = match explicit_duration.or(end_duration) {
        Some(minutes) => (minutes, true),
        None => (DEFAULT_DURATION_MINUTES, false),
    };

    let category = classify_category(input);

    let description = match working.trim() {
        "" => input.to_string(),
        cleaned => cleaned.to_string(),
    };
    let mut title = extract_title(&working);
    if title.is_empty() {
        title = input.trim().to_string();
    }

    debug!(
        "fallback analysis: day_offset={} start={:?} duration={} (explicit={}) category={:?} title='{}'",
        day_offset, start_time, duration_minutes, duration_explicit, category, title
    );

    FallbackAnalysis {
        analysis: TaskAnalysis {
            title,
            description,
            duration_minutes,
            deadline: None,
            preferred_start_time,
            category,
        },
        duration_explicit,
    }
}

/// Overlay the deterministic local findings onto an externally produced
/// analysis.
///
/// The local parse wins for explicit numeric/time mentions: a parsed start
/// time always replaces the external one, and a duration replaces it only
/// when it was derived from explicit text.
pub fn apply_fallback(analysis: &TaskAnalysis, fallback: &FallbackAnalysis) -> TaskAnalysis {
    let mut corrected = analysis.clone();
    if fallback.analysis.preferred_start_time.is_some() {
        corrected.preferred_start_time = fallback.analysis.preferred_start_time;
    }
    if fallback.duration_explicit {
        corrected.duration_minutes = fallback.analysis.duration_minutes;
    }
    corrected
}

/// Classify by the first matching keyword family, in fixed priority order.
pub fn classify_category(text: &str) -> TaskCategory {
    let families: [(&[&str], TaskCategory); 5] = [
        (EXERCISE_KEYWORDS, TaskCategory::Exercise),
        (WORK_KEYWORDS, TaskCategory::Work),
        (STUDY_KEYWORDS, TaskCategory::Study),
        (CHORE_KEYWORDS, TaskCategory::Chore),
        (SHOPPING_KEYWORDS, TaskCategory::Shopping),
    ];
    for (keywords, category) in families {
        if keywords.iter().any(|k| text.contains(k)) {
            return category;
        }
    }
    TaskCategory::Other
}

/// Reduce a spoken, verb-bearing sentence into a short `/`-joined
/// noun-phrase title.
///
/// Expects text already stripped of date/time phrases (the analyzer passes
/// its working copy). Returns the trimmed input when no segment survives.
pub fn extract_title(text: &str) -> String {
    let mut work = text.to_string();

    for filler in FILLER_WORDS {
        work = work.replace(filler, "");
    }
    for connector in PRE_CONNECTIVES {
        work = work.replace(connector, &SEGMENT_DELIMITER.to_string());
    }
    for pattern in CLAUSE_BREAK_PATTERNS {
        work = work.replace(pattern, &SEGMENT_DELIMITER.to_string());
    }
    for connective in COORDINATING_CONNECTIVES {
        work = work.replace(connective, &SEGMENT_DELIMITER.to_string());
    }
    work = patterns()
        .or_between_kana
        .replace_all(&work, format!("${{1}}{SEGMENT_DELIMITER}${{2}}"))
        .into_owned();

    let mut keywords: Vec<String> = Vec::new();
    for segment in work.split(SEGMENT_DELIMITER) {
        let cleaned = clean_segment(segment);
        if !cleaned.is_empty() && !keywords.contains(&cleaned) {
            keywords.push(cleaned);
        }
    }

    if keywords.is_empty() {
        text.trim().to_string()
    } else {
        keywords.join(" / ")
    }
}

// ── Pipeline stages ─────────────────────────────────────────────────────────

/// Stage 1: day offset. 明後日 is checked before 明日 since the latter is a
/// substring of the former. Consumes the word plus a trailing の.
fn extract_day_offset(working: &mut String) -> i64 {
    for (word, offset) in [("明後日", 2), ("明日", 1)] {
        if let Some(pos) = working.find(word) {
            let mut end = pos + word.len();
            if working[end..].starts_with('の') {
                end += 'の'.len_utf8();
            }
            working.replace_range(pos..end, "");
            return offset;
        }
    }
    0
}

/// Stage 2: preferred start time. The first valid clock-time match in the
/// sentence wins; 時間 durations and まで end times are left for later
/// stages.
fn extract_start_time(working: &mut String) -> Option<NaiveTime> {
    let text = working.clone();
    for caps in patterns().start_time.captures_iter(&text) {
        if let Some((range, time)) = start_time_candidate(&text, &caps) {
            working.replace_range(range, "");
            return Some(time);
        }
    }
    None
}

/// Validate one start-time regex hit and work out the consumed byte range.
fn start_time_candidate(text: &str, caps: &regex::Captures) -> Option<(Range<usize>, NaiveTime)> {
    let whole = caps.get(0)?;
    let mut end = whole.end();

    // 「3時間」 is a duration, not a clock time
    if text[end..].starts_with('間') {
        return None;
    }

    let hour: u32 = caps.get(2)?.as_str().parse().ok()?;
    if hour > 23 {
        return None;
    }

    let mut minute = 0;
    if text[end..].starts_with('半') {
        minute = 30;
        end += '半'.len_utf8();
    } else if let Some(mc) = patterns().minute_suffix.captures(&text[end..]) {
        let matched = mc.get(0)?;
        // 「9時30分間」: the minute clause is a duration, leave it alone
        if !text[end + matched.end()..].starts_with('間') {
            let m: u32 = mc.get(1)?.as_str().parse().ok()?;
            if m < 60 {
                minute = m;
                end += matched.end();
            }
        }
    }

    // 「10時まで」 is an end-of-activity time, not a start
    if text[end..].starts_with("まで") {
        return None;
    }

    let hour = match caps.get(1).map(|m| m.as_str()) {
        Some("午後") | Some("夕方") | Some("夜") if hour < 12 => hour + 12,
        _ => hour,
    };

    // Consume a trailing connective particle with the phrase
    for particle in ["からは", "から", "に"] {
        if text[end..].starts_with(particle) {
            end += particle.len();
            break;
        }
    }

    NaiveTime::from_hms_opt(hour, minute, 0).map(|time| (whole.start()..end, time))
}

/// Stage 3: explicit end time (〜まで). The substring is always consumed;
/// a duration is derived only when a start time was parsed and the
/// difference is positive.
fn extract_end_duration(working: &mut String, start_time: Option<NaiveTime>) -> Option<i64> {
    let text = working.clone();
    let caps = patterns().end_time.captures(&text)?;
    let whole = caps.get(0)?;
    let hour: i64 = caps.get(1)?.as_str().parse().ok()?;
    let minute: i64 = if caps.get(2).is_some() {
        30
    } else {
        caps.get(3)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    working.replace_range(whole.range(), "");

    let start = start_time?;
    let start_total = minutes_of_day(start);
    let end_total = hour * 60 + minute;
    let duration = end_total - start_total;
    if duration > 0 {
        Some(duration)
    } else {
        None
    }
}

fn minutes_of_day(time: NaiveTime) -> i64 {
    use chrono::Timelike;
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

/// Stage 4: explicit duration in the residual text. N時間(M分)? first, then
/// a bare N分.
fn extract_explicit_duration(working: &mut String) -> Option<i64> {
    let text = working.clone();
    if let Some(caps) = patterns().hours_duration.captures(&text) {
        let whole = caps.get(0)?;
        let hours: i64 = caps.get(1)?.as_str().parse().ok()?;
        let minutes: i64 = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        working.replace_range(whole.range(), "");
        return Some(hours * 60 + minutes);
    }
    if let Some(caps) = patterns().minutes_duration.captures(&text) {
        let whole = caps.get(0)?;
        let minutes: i64 = caps.get(1)?.as_str().parse().ok()?;
        if minutes > 0 {
            working.replace_range(whole.range(), "");
            return Some(minutes);
        }
    }
    None
}

/// Per-segment cleanup for stage 6.
fn clean_segment(segment: &str) -> String {
    let mut s = segment.trim().to_string();

    // 「スーパーに行って買い物」→「買い物」: the motion phrase is transport,
    // not the task
    let snapshot = s.clone();
    if let Some(m) = patterns().motion_prefix.find(&snapshot) {
        s = snapshot[m.end()..].to_string();
    }

    // 「着替えて職場」→「着替え・職場」: keep both halves as one compound
    s = patterns().te_link.replace_all(&s, "${1}・${2}").into_owned();

    loop {
        let before = s.len();
        s = s.trim().to_string();
        for remnant in TRAILING_REMNANTS {
            if let Some(stripped) = s.strip_suffix(remnant) {
                s = stripped.to_string();
            }
        }
        for remnant in LEADING_REMNANTS {
            if let Some(stripped) = s.strip_prefix(remnant) {
                s = stripped.to_string();
            }
        }
        if s.len() == before {
            break;
        }
    }
    s.trim().to_string()
}

// ── Tests ───────────────────────────────────────────────────────────────────
