//! Declarative per-source text slicing.
//!
//! Sites wrap their articles in navigation, share widgets and comment
//! sections that only make sense to strip with site knowledge. Each source id
//! maps to an ordered list of [`SliceRule`]s; adding a site means adding an
//! entry to [`CleaningRegistry::builtin`] or calling
//! [`CleaningRegistry::register`], never touching dispatch code.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static EXCESS_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Collapse three or more consecutive newlines to one blank line and trim.
pub fn collapse_blank_lines(text: &str) -> String {
    EXCESS_BLANK_LINES.replace_all(text, "\n\n").trim().to_string()
}

/// One text-surgery step.
#[derive(Debug, Clone)]
pub enum SliceRule {
    /// Keep the text after the first match. With `include_match` the match
    /// itself is kept too; `prefix` is prepended to what remains. No match
    /// leaves the text untouched.
    KeepAfter {
        pattern: Regex,
        include_match: bool,
        prefix: Option<&'static str>,
    },
    /// Keep the text before the first match; no match leaves it untouched.
    KeepBefore { pattern: Regex },
    /// Remove every match.
    Drop { pattern: Regex },
    /// Apply the first alternative whose pattern matches.
    FirstOf(Vec<SliceRule>),
    /// Collapse blank-line runs and trim.
    Collapse,
}

impl SliceRule {
    pub fn keep_after(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::KeepAfter {
            pattern: Regex::new(pattern)?,
            include_match: false,
            prefix: None,
        })
    }

    pub fn keep_from(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::KeepAfter {
            pattern: Regex::new(pattern)?,
            include_match: true,
            prefix: None,
        })
    }

    pub fn keep_after_with_prefix(pattern: &str, prefix: &'static str) -> Result<Self, regex::Error> {
        Ok(Self::KeepAfter {
            pattern: Regex::new(pattern)?,
            include_match: false,
            prefix: Some(prefix),
        })
    }

    pub fn keep_before(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::KeepBefore {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn drop(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Drop {
            pattern: Regex::new(pattern)?,
        })
    }

    fn matches(&self, text: &str) -> bool {
        match self {
            Self::KeepAfter { pattern, .. }
            | Self::KeepBefore { pattern }
            | Self::Drop { pattern } => pattern.is_match(text),
            Self::FirstOf(alts) => alts.iter().any(|r| r.matches(text)),
            Self::Collapse => true,
        }
    }

    /// Apply the rule to `text`.
    pub fn apply(&self, text: &str) -> String {
        match self {
            Self::KeepAfter {
                pattern,
                include_match,
                prefix,
            } => match pattern.find(text) {
                Some(m) => {
                    let from = if *include_match { m.start() } else { m.end() };
                    let rest = text[from..].trim();
                    match prefix {
                        Some(p) => format!("{p}{rest}"),
                        None => rest.to_string(),
                    }
                }
                None => text.to_string(),
            },
            Self::KeepBefore { pattern } => match pattern.find(text) {
                Some(m) => text[..m.start()].trim().to_string(),
                None => text.to_string(),
            },
            Self::Drop { pattern } => pattern.replace_all(text, "").into_owned(),
            Self::FirstOf(alts) => match alts.iter().find(|r| r.matches(text)) {
                Some(rule) => rule.apply(text),
                None => text.to_string(),
            },
            Self::Collapse => collapse_blank_lines(text),
        }
    }
}

/// Source id → ordered slicing rules.
#[derive(Debug, Clone, Default)]
pub struct CleaningRegistry {
    rules: HashMap<String, Vec<SliceRule>>,
}

impl CleaningRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register (or replace) the rules for `source_id`.
    pub fn register(&mut self, source_id: impl Into<String>, rules: Vec<SliceRule>) {
        self.rules.insert(source_id.into(), rules);
    }

    pub fn rules_for(&self, source_id: &str) -> &[SliceRule] {
        self.rules.get(source_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Run every rule registered for `source_id`, in registration order.
    pub fn apply(&self, source_id: &str, text: &str) -> String {
        self.rules_for(source_id)
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc))
    }

    /// Rules for the sites the harvester ships with.
    pub fn builtin() -> Result<Self, regex::Error> {
        let mut reg = Self::empty();

        reg.register(
            "hf_blog",
            vec![SliceRule::keep_from(
                r"\[\]\(https://huggingface\.co/blog/[^)]+#[^)]+\)\s+\S",
            )?],
        );

        reg.register(
            "nvidia_dev_blog",
            vec![SliceRule::FirstOf(vec![
                SliceRule::keep_after(r"(?m)^(?:Share\s*$|Copy\s+link)")?,
                SliceRule::keep_from(r"(?m)^(?:By\s+\S|Table of Contents)")?,
            ])],
        );

        reg.register(
            "geeknews",
            vec![
                SliceRule::keep_from(r"(?m)^\*\s+")?,
                SliceRule::keep_before(r"(?m)인증 이메일|^\[▲\]\(javascript:votec")?,
                SliceRule::keep_before(r"\[사이트 이용법\]")?,
            ],
        );

        reg.register(
            "openai_news",
            vec![
                SliceRule::FirstOf(vec![
                    SliceRule::keep_after(r"(?m)^(?:Share|Copy link)")?,
                    SliceRule::keep_from(r"(?m)^[A-Z][a-z].*[.!]$")?,
                ]),
                SliceRule::keep_before(r"(?m)OpenAI ©|Back to index|\(opens in a new window\)\s*$")?,
            ],
        );

        reg.register(
            "kisa_notice",
            vec![
                SliceRule::keep_after(
                    r"등록일\s+\d{4}[.\-]\d{2}[.\-]\d{2}|작성일\s+\d{4}[.\-]\d{2}[.\-]\d{2}|조회수\s+\d+",
                )?,
                SliceRule::keep_before(r"Copyright\(C\)")?,
                SliceRule::keep_before(r"Now Loading")?,
            ],
        );

        reg.register(
            "hf_daily_papers",
            vec![
                SliceRule::FirstOf(vec![
                    SliceRule::keep_after_with_prefix(
                        r"(?im)^Abstract\s*\n\s*[-=]+\s*$",
                        "Abstract\n--------\n",
                    )?,
                    SliceRule::keep_after_with_prefix(r"(?im)^Abstract\s*\n", "Abstract\n\n")?,
                ]),
                SliceRule::keep_before(
                    r"(?m)^### Community|^Comment\s*$|Sign up.*to comment|\[- \[x\] Upvote|^Reply\s*$|Upload images.*clicking here",
                )?,
            ],
        );

        let spri = vec![
            SliceRule::keep_after(r"(?i)조회수\s+\d+|작성일\s+[\d.\-]+")?,
            SliceRule::drop(
                r"!\[Image[^\]]*\]\([^)]*(?:down_icon|html_icon|sns_icon|copy_link)[^)]*\)[^\n]*",
            )?,
            SliceRule::drop(r"PDF\s*다운로드")?,
            SliceRule::drop(r"\[HTML\s*보기\]\([^)]+\)")?,
            SliceRule::keep_after(r"공유\s*열기")?,
            SliceRule::drop(
                r#"\*\s+\[!\[Image[^\]]*(?:공유|연결|연동|복사)[^\]]*\]\([^)]+\)\]\([^)]+\s*"[^"]*"\)"#,
            )?,
            SliceRule::drop(r"\[!\[Image[^\]]*(?:공유|연결|연동|복사)[^\]]*\]\([^)]+\)\]\([^)]+\)")?,
            SliceRule::keep_before(r"글자크기")?,
            SliceRule::Collapse,
        ];
        reg.register("spri_reports", spri.clone());
        reg.register("spri_research", spri);

        reg.register(
            "deepmind_blog",
            vec![SliceRule::FirstOf(vec![
                SliceRule::keep_after(r"(?im)^(?:Share|Copied)[ \t]*$")?,
                SliceRule::keep_after(r"(?i)Copy link")?,
            ])],
        );

        reg.register(
            "nia_aihub",
            vec![
                SliceRule::keep_after(r"(?i)조회수\s+\d+")?,
                SliceRule::keep_before(
                    r"(?m)\[트위터\]|\[페이스북\]|\[구글 플러스\]|\[인쇄\]|^목록\s*$|_\\?_다음글|_\\?_이전글|\[_TOP_\]|대표전화|개인정보처리방침",
                )?,
            ],
        );

        Ok(reg)
    }
}
