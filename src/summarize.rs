//! Single-shot lecture summarization.
//!
//! All chunks of a lecture are concatenated and sent to the model in one
//! request. Three prompt tiers trade detail for strictness depending on the
//! requested word budget, and a set of post-processing guards (junk-token
//! cleanup, sentence-aware truncation) keep the output inside that budget
//! even when the model ignores its instructions.
//!
//! # Provider
//!
//! `summarizer.provider` selects the backend:
//! - `"disabled"` — every summarization attempt returns an error.
//! - `"openrouter"` — chat-completions call against the configured
//!   `base_url`, authenticated with the `OPENROUTER_API_KEY` environment
//!   variable.
//!
//! # Retry strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use regex::Regex;
use sqlx::SqlitePool;
use std::sync::OnceLock;
use std::time::Duration;

use crate::config::{Config, SummarizerConfig};
use crate::retrieve;

/// Word budget at or below which the cheat-sheet tier applies.
const TIER_1_MAX_WORDS: i64 = 300;
/// Word budget at or below which the study-guide tier applies.
const TIER_2_MAX_WORDS: i64 = 600;

/// Models overshoot small budgets badly; ask for 35% and let truncation
/// handle the rest.
const TIER_1_BUFFER: f64 = 0.35;
/// Standard tier asks for 60% of the budget so the model finishes naturally.
const TIER_2_BUFFER: f64 = 0.60;

/// Tokens-per-word estimates used for the hard generation cap.
const TOKENS_PER_WORD_ARABIC: f64 = 2.5;
const TOKENS_PER_WORD_LATIN: f64 = 1.5;
/// Safety margin on the token cap, plus a floor so structure always fits.
const TOKEN_CAP_MARGIN: f64 = 1.25;
const TOKEN_CAP_FLOOR: i64 = 250;

const SYSTEM_TIER_1: &str = "\
You are a hyper-efficient academic assistant creating a CONCISE CHEAT SHEET.

1. LANGUAGE: {lang_instruction}
2. WORD COUNT: your target is {target_words} words. This is a hard limit; do not exceed it. Brevity is essential.
3. CONTENT: extract only the most critical information: definitions, formulas, and key rules. Absolutely no examples, explanations, or conversational fluff.
4. FORMATTING: use `### Title` for sections with a blank line before and after every title. Use nested bullets (`-`) and bold key terms. Preserve LaTeX formulas ($...$). Do not write paragraphs.";

const SYSTEM_TIER_2: &str = "\
You are an expert professor creating a STANDARD STUDY GUIDE.

1. LANGUAGE: {lang_instruction}
2. WORD COUNT: target approximately {target_words} words. It is critical you do not significantly exceed this limit.
3. CONTENT: synthesize a coherent study guide. Merge duplicate concepts. Include key examples only when essential for understanding.
4. FORMATTING: use `### Title` for every main topic with a blank line before and after every title. Use standard bullets (`-`) with proper indentation. Do not write a single large block of text. Preserve LaTeX formulas ($...$).";

const SYSTEM_TIER_3: &str = "\
You are an expert editor compiling a COMPREHENSIVE SUMMARY.

1. LANGUAGE: {lang_instruction}
2. LENGTH: minimum {target_words} words. Be detailed and expansive.
3. CONTENT: detailed explanation of all topics. Retain substance.
4. FORMATTING: use `### Title` for main topics with a blank line before and after every title. Never output a single paragraph; break text frequently and insert a blank line between paragraphs. Preserve LaTeX formulas ($...$).";

const LANG_INSTRUCTION_ARABIC: &str = "Input is ARABIC. Output must be in ARABIC. \
Keep English/technical terms in English. Keep it concise.";

const LANG_INSTRUCTION_ENGLISH: &str = "Input is primarily ENGLISH. Output must be in ENGLISH. \
If the input contains Arabic segments, summarize them in Arabic; do not translate Arabic to English.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Arabic,
    English,
}

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[\w\x{0600}-\x{06FF}]+\b").expect("static regex"))
}

/// Count legitimate words (Latin, Arabic, numbers), ignoring markdown
/// syntax and LaTeX math.
pub fn count_words(text: &str) -> usize {
    static MATH: OnceLock<(Regex, Regex)> = OnceLock::new();
    let (display, inline) = MATH.get_or_init(|| {
        (
            Regex::new(r"\$\$[^$]+\$\$").expect("static regex"),
            Regex::new(r"\$[^$]+\$").expect("static regex"),
        )
    });
    let text = display.replace_all(text, "");
    let text = inline.replace_all(&text, "");
    word_regex().find_iter(&text).count()
}

/// Detect whether the text is primarily Arabic or English. Code blocks are
/// stripped first: code is usually English and would hide Arabic commentary.
/// Strict majority rule, no threshold.
pub fn detect_primary_language(text: &str) -> Language {
    static STRIP: OnceLock<(Regex, Regex, Regex, Regex)> = OnceLock::new();
    let (fences, inline_code, arabic, latin) = STRIP.get_or_init(|| {
        (
            Regex::new(r"```[\s\S]*?```").expect("static regex"),
            Regex::new(r"`[^`\n]+`").expect("static regex"),
            Regex::new(
                r"[\x{0600}-\x{06FF}\x{0750}-\x{077F}\x{08A0}-\x{08FF}\x{FB50}-\x{FDFF}\x{FE70}-\x{FEFF}]",
            )
            .expect("static regex"),
            Regex::new(r"[a-zA-Z]").expect("static regex"),
        )
    });

    let no_code = fences.replace_all(text, "");
    let no_code = inline_code.replace_all(&no_code, "");

    let arabic_chars = arabic.find_iter(&no_code).count();
    let latin_chars = latin.find_iter(&no_code).count();

    if arabic_chars > latin_chars {
        Language::Arabic
    } else {
        Language::English
    }
}

/// Strip junk tokens some models leak into their output.
pub fn clean_output(text: &str) -> String {
    let mut out = text.to_string();
    for token in ["<|im_start|>", "<|im_end|>", "```json", "```"] {
        out = out.replace(token, "");
    }
    out.trim().to_string()
}

/// Truncate to `max_words`, cutting at the last complete sentence inside the
/// limit. Falls back to a hard cut plus a period when no sentence end exists.
pub fn smart_truncate(text: &str, max_words: usize) -> String {
    let matches: Vec<_> = word_regex().find_iter(text).collect();
    if matches.len() <= max_words || max_words == 0 {
        return text.to_string();
    }

    let strict_limit = matches[max_words - 1].end();
    let candidate = &text[..strict_limit];

    let last_sentence_end = candidate
        .rfind('.')
        .into_iter()
        .chain(candidate.rfind('!'))
        .chain(candidate.rfind('?'))
        .max();

    match last_sentence_end {
        Some(pos) => candidate[..=pos].to_string(),
        None => format!("{}.", candidate),
    }
}

/// Pick the prompt tier and the effective (buffered) word target.
fn select_tier(target_words: i64) -> (&'static str, i64) {
    if target_words <= TIER_1_MAX_WORDS {
        (SYSTEM_TIER_1, (target_words as f64 * TIER_1_BUFFER) as i64)
    } else if target_words <= TIER_2_MAX_WORDS {
        (SYSTEM_TIER_2, (target_words as f64 * TIER_2_BUFFER) as i64)
    } else {
        (SYSTEM_TIER_3, target_words)
    }
}

/// Hard cap on generated tokens so a runaway generation cannot blow past the
/// budget by orders of magnitude.
fn hard_token_limit(target_words: i64, language: Language) -> i64 {
    let per_word = match language {
        Language::Arabic => TOKENS_PER_WORD_ARABIC,
        Language::English => TOKENS_PER_WORD_LATIN,
    };
    ((target_words as f64 * per_word * TOKEN_CAP_MARGIN) as i64).max(TOKEN_CAP_FLOOR)
}

/// Generate a single-shot summary from a lecture's chunks.
pub async fn run_single_shot_summary(
    config: &SummarizerConfig,
    chunks: &[String],
    target_words: i64,
) -> Result<String> {
    if !config.is_enabled() {
        bail!("Summarizer provider is disabled. Set [summarizer] provider in config.");
    }
    if chunks.is_empty() {
        bail!("No content to summarize");
    }

    println!(
        "--- Summarizing {} chunks (target {} words) ---",
        chunks.len(),
        target_words
    );

    let combined_notes = chunks.join("\n\n");
    let language = detect_primary_language(&combined_notes);
    let lang_instruction = match language {
        Language::Arabic => LANG_INSTRUCTION_ARABIC,
        Language::English => LANG_INSTRUCTION_ENGLISH,
    };

    let (template, effective_target) = select_tier(target_words);
    let system_rules = template
        .replace("{target_words}", &effective_target.to_string())
        .replace("{lang_instruction}", lang_instruction);

    let user_content = format!(
        "Here is the lecture content to summarize:\n\n{}",
        combined_notes
    );

    let max_tokens = hard_token_limit(target_words, language);
    let raw = chat_completion(config, &system_rules, &user_content, max_tokens).await?;

    let cleaned = clean_output(&raw);
    let final_text = smart_truncate(&cleaned, target_words as usize);

    println!(
        "--- Summary complete: {} words (limit {}) ---",
        count_words(&final_text),
        target_words
    );
    Ok(final_text)
}

/// Call the OpenRouter chat-completions API with retry/backoff.
async fn chat_completion(
    config: &SummarizerConfig,
    system: &str,
    user: &str,
    max_tokens: i64,
) -> Result<String> {
    let api_key = std::env::var("OPENROUTER_API_KEY")
        .map_err(|_| anyhow::anyhow!("OPENROUTER_API_KEY not set"))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
    let body = serde_json::json!({
        "model": config.model,
        "messages": [
            {"role": "system", "content": system},
            {"role": "user", "content": user}
        ],
        "max_tokens": max_tokens,
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    return parse_completion_response(&json);
                }

                // Rate limited or server error — retry
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!(
                        "Summarizer API error {}: {}",
                        status,
                        body_text
                    ));
                    continue;
                }

                // Client error (not 429) — don't retry
                let body_text = response.text().await.unwrap_or_default();
                bail!("Summarizer API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Summarization failed after retries")))
}

/// Pull the first choice's message content out of a chat-completions response.
fn parse_completion_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid summarizer response: missing choices[0].message.content"))
}

/// Summarize a lecture with caching: return the stored summary for this
/// `(lecture, target_words)` pair unless `force_refresh` is set, otherwise
/// generate, store, and return a fresh one.
pub async fn summarize_lecture(
    config: &Config,
    pool: &SqlitePool,
    lecture_id: &str,
    target_words: i64,
    force_refresh: bool,
) -> Result<String> {
    if !force_refresh {
        if let Some(cached) = cached_summary(pool, lecture_id, target_words).await? {
            println!("--- [cache hit] {} ({} words) ---", lecture_id, target_words);
            return Ok(cached);
        }
    }

    let chunks = retrieve::chunks_for_lecture(pool, lecture_id).await?;
    if chunks.is_empty() {
        bail!("No content found for lecture '{}'", lecture_id);
    }

    let summary = run_single_shot_summary(&config.summarizer, &chunks, target_words).await?;
    store_summary(pool, lecture_id, target_words, &summary).await?;

    Ok(summary)
}

async fn cached_summary(
    pool: &SqlitePool,
    lecture_id: &str,
    target_words: i64,
) -> Result<Option<String>> {
    let content: Option<String> = sqlx::query_scalar(
        "SELECT content FROM summaries WHERE lecture_id = ? AND target_words = ?",
    )
    .bind(lecture_id)
    .bind(target_words)
    .fetch_optional(pool)
    .await?;
    Ok(content)
}

async fn store_summary(
    pool: &SqlitePool,
    lecture_id: &str,
    target_words: i64,
    content: &str,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        r#"
        INSERT INTO summaries (lecture_id, target_words, content, created_at) VALUES (?, ?, ?, ?)
        ON CONFLICT(lecture_id, target_words) DO UPDATE SET
            content = excluded.content,
            created_at = excluded.created_at
        "#,
    )
    .bind(lecture_id)
    .bind(target_words)
    .bind(content)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// CLI entry point for `lct summarize`.
pub async fn run_summarize(
    config: &Config,
    lecture_id: &str,
    target_words: i64,
    force_refresh: bool,
) -> Result<()> {
    let pool = crate::db::connect(&config.db).await?;
    let summary = summarize_lecture(config, &pool, lecture_id, target_words, force_refresh).await?;
    pool.close().await;
    println!("{}", summary);
    Ok(())
}
