//! Keyword relevance gate for ranked-item titles.
//!
//! One case-insensitive alternation; any match accepts. There is no scoring.

use once_cell::sync::Lazy;
use regex::Regex;

const KEYWORDS: &[&str] = &[
    // AI / ML
    r"\bai\b", r"\bartificial.intelligence\b", r"\bmachine.learning\b", r"\bml\b",
    r"\bdeep.learning\b", r"\bneural.net", r"\btransformer", r"\bllm\b", r"\bgpt\b",
    r"\bchatgpt\b", r"\bopenai\b", r"\banthropic\b", r"\bclaude\b", r"\bgemini\b",
    r"\bgemma\b", r"\bllama\b", r"\bmistral\b", r"\bdiffusion\b", r"\bstable.diffusion\b",
    r"\bagen(?:t|tic)\b", r"\brag\b", r"\bfine.?tun", r"\bprompt", r"\bembedding",
    r"\bvector.?(?:db|database|store|search)\b", r"\bnlp\b", r"\bcomputer.vision\b",
    r"\breinforcement.learning\b", r"\brlhf\b", r"\bdpo\b",
    r"\brobot", r"\bautonomous\b", r"\bself.driving\b",
    r"\bgenerat(?:ive|ion)\b", r"\bfoundation.model\b", r"\bopen.?source.?model\b",
    r"\bmultimodal\b", r"\bspeech", r"\btts\b", r"\bstt\b", r"\bocr\b",
    r"\bimage.gen", r"\bvideo.gen", r"\btext.to",
    // dev / infra
    r"\bpython\b", r"\brust\b", r"\btypescript\b", r"\bjavascript\b",
    r"\bgolang\b", r"\bkubernetes\b", r"\bdocker\b", r"\bwasm\b",
    r"\bapi\b", r"\bsdk\b", r"\bopen.?source\b", r"\bgithub\b",
    r"\bcompiler\b", r"\bkernel\b", r"\blinux\b",
    r"\bcloud\b", r"\baws\b", r"\bgcp\b", r"\bazure\b",
    r"\bdatabase\b", r"\bpostgres", r"\bsqlite\b", r"\bredis\b",
    r"\bgpu\b", r"\bnvidia\b", r"\bcuda\b", r"\btpu\b",
    r"\bserverless\b", r"\bedge.comput",
    // industry
    r"\bstartup\b", r"\bfunding\b", r"\bseries.[a-d]\b", r"\bipo\b",
    r"\bgoogle\b", r"\bmeta\b", r"\bmicrosoft\b", r"\bapple\b", r"\bamazon\b",
    r"\bdeepseek\b", r"\bdeep.?mind\b", r"\bhugging.?face\b",
    // data / security
    r"\bcyber", r"\bsecurity\b", r"\bprivacy\b", r"\bencrypt",
    r"\bdata.?(?:science|engineer|pipeline)\b", r"\bmlops\b",
    r"\bscal(?:e|ing|ability)\b", r"\bperformance\b", r"\bbenchmark\b",
];

static RELEVANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("(?i){}", KEYWORDS.join("|"))).unwrap());

/// Whether a title mentions any tracked topic.
pub fn is_relevant(title: &str) -> bool {
    RELEVANCE.is_match(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_ai_headline() {
        assert!(is_relevant("OpenAI ships new GPT model"));
    }

    #[test]
    fn rejects_unrelated_headline() {
        assert!(!is_relevant("Local bakery opens downtown"));
    }

    #[test]
    fn word_boundaries_prevent_substring_hits() {
        // "ai" inside "said" and "rust" inside "trust" must not match.
        assert!(!is_relevant("He said the trust fund closed"));
        assert!(is_relevant("Why I rewrote it in Rust"));
    }

    #[test]
    fn prefix_patterns_match_word_families() {
        assert!(is_relevant("Robotics lab unveils arm"));
        assert!(is_relevant("Fine-tuning small models"));
        assert!(is_relevant("Cybersecurity budget rises"));
    }
}
