//! Prompt payload assembly for the plan → codegen → refine loop.
//!
//! Every payload is newline-delimited text made of `KEY: value` lines and
//! `KEY:\n<block>` sections. Consumers match sections by line prefix, so
//! labels and their order per mode are a compatibility contract.
//!
//! | Mode | Sections |
//! |---|---|
//! | `PLAN_ONLY`, `PLAN_ENTRY` | MODE, CURRENT_PAGE_URL, USER_PROVIDED_URL, USER_PROVIDED_URLS, SAME_PAGE_OPERATION |
//! | `PLAN_REFINE` | MODE, CURRENT_PAGE_URL, VISUAL_DESCRIPTION, USER_PROVIDED_URL, USER_INPUT_RAW, USER_PROVIDED_URLS, SAME_PAGE_OPERATION |
//! | `CODEGEN` | MODE, CURRENT_PAGE_URL, VISUAL_DESCRIPTION, PLAN, STEP_HTMLS_CLEANED |
//! | `REFINE_CODE` | MODE, CURRENT_PAGE_URL, VISUAL_DESCRIPTION, USER_PROVIDED_URLS, CURRENT_PAGE_HTML_CLEANED, PLAN, STEP_HTMLS_CLEANED |
//!
//! Absent optional inputs are omitted, never an error.

pub mod resolve;
pub mod steps;

use std::str::FromStr;

use pagectx_core::urls::{
    LabeledUrls, extract_first_url, extract_labeled_urls, is_same_page_operation, merge_labeled_urls,
};
use pagectx_core::{AppConfig, Snapshot};
use serde::{Deserialize, Serialize};

pub use resolve::resolve_current_url;
pub use steps::{STEP_HTMLS_TRUNCATION_MARKER, build_step_htmls};

/// Appended when the current page markup exceeds its budget.
pub const CURRENT_HTML_TRUNCATION_MARKER: &str = "\n...[CURRENT_PAGE_HTML_TRUNCATED]";

/// Phase of the agent loop a payload is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayloadMode {
    PlanOnly,
    PlanEntry,
    PlanRefine,
    Codegen,
    RefineCode,
}

impl PayloadMode {
    pub const ALL: [PayloadMode; 5] =
        [PayloadMode::PlanOnly, PayloadMode::PlanEntry, PayloadMode::PlanRefine, PayloadMode::Codegen, PayloadMode::RefineCode];

    pub fn as_str(self) -> &'static str {
        match self {
            PayloadMode::PlanOnly => "PLAN_ONLY",
            PayloadMode::PlanEntry => "PLAN_ENTRY",
            PayloadMode::PlanRefine => "PLAN_REFINE",
            PayloadMode::Codegen => "CODEGEN",
            PayloadMode::RefineCode => "REFINE_CODE",
        }
    }
}

impl std::fmt::Display for PayloadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payload mode: {0}")]
pub struct UnknownMode(pub String);

impl FromStr for PayloadMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PayloadMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownMode(wanted.to_string()))
    }
}

/// Character budgets for the markup-bearing sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLimits {
    pub step_htmls_budget: usize,
    pub current_html_budget: usize,
}

impl Default for PayloadLimits {
    fn default() -> Self {
        Self { step_htmls_budget: 500_000, current_html_budget: 200_000 }
    }
}

impl From<&AppConfig> for PayloadLimits {
    fn from(config: &AppConfig) -> Self {
        Self { step_htmls_budget: config.step_htmls_budget, current_html_budget: config.current_html_budget }
    }
}

/// Everything a payload can be built from. Unused fields are ignored per mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadInput<'a> {
    /// URL reported by the browser driver.
    pub current_url: &'a str,
    /// The user's task instructions.
    pub instructions: &'a str,
    /// Follow-up hint for the refine modes.
    pub refine_hint: Option<&'a str>,
    pub plan: Option<&'a str>,
    pub visual_description: Option<&'a str>,
    /// Compacted markup of the live page (REFINE_CODE).
    pub current_markup: Option<&'a str>,
    /// Snapshots of earlier steps, in step order.
    pub snapshots: &'a [Snapshot],
}

/// Builds mode-specific payloads.
#[derive(Debug, Clone, Default)]
pub struct PayloadAssembler {
    limits: PayloadLimits,
}

impl PayloadAssembler {
    pub fn new(limits: PayloadLimits) -> Self {
        Self { limits }
    }

    /// Build the payload for `mode`.
    pub fn assemble(&self, mode: PayloadMode, input: &PayloadInput<'_>) -> String {
        match mode {
            PayloadMode::PlanOnly => self.plan_only(input),
            PayloadMode::PlanEntry => self.plan_entry(input),
            PayloadMode::PlanRefine => self.plan_refine(input),
            PayloadMode::Codegen => self.codegen(input),
            PayloadMode::RefineCode => self.refine_code(input),
        }
    }

    pub fn plan_only(&self, input: &PayloadInput<'_>) -> String {
        plan_payload(PayloadMode::PlanOnly, input)
    }

    pub fn plan_entry(&self, input: &PayloadInput<'_>) -> String {
        plan_payload(PayloadMode::PlanEntry, input)
    }

    pub fn plan_refine(&self, input: &PayloadInput<'_>) -> String {
        let hint = input.refine_hint.unwrap_or_default();
        let mut payload = Sections::new(PayloadMode::PlanRefine);
        payload.line_opt("CURRENT_PAGE_URL", page_url(input.current_url));
        payload.block_opt("VISUAL_DESCRIPTION", input.visual_description);
        payload.line_opt("USER_PROVIDED_URL", extract_first_url(hint).as_deref());
        if let Some(raw) = input.refine_hint.filter(|h| !h.trim().is_empty()) {
            payload.block("USER_INPUT_RAW", raw);
        }
        payload.urls("USER_PROVIDED_URLS", &merged_urls(input));
        payload.flag("SAME_PAGE_OPERATION", is_same_page_operation(&format!("{hint}\n{}", input.instructions)));
        payload.finish()
    }

    pub fn codegen(&self, input: &PayloadInput<'_>) -> String {
        let current_url = resolve_current_url(input.current_url, input.snapshots);
        let mut payload = Sections::new(PayloadMode::Codegen);
        payload.line_opt("CURRENT_PAGE_URL", Some(current_url.as_str()));
        payload.block_opt("VISUAL_DESCRIPTION", input.visual_description);
        payload.block_opt("PLAN", input.plan);
        self.step_htmls(&mut payload, input.snapshots);
        payload.finish()
    }

    pub fn refine_code(&self, input: &PayloadInput<'_>) -> String {
        let current_url = resolve_current_url(input.current_url, input.snapshots);
        let mut payload = Sections::new(PayloadMode::RefineCode);
        payload.line_opt("CURRENT_PAGE_URL", Some(current_url.as_str()));
        payload.block_opt("VISUAL_DESCRIPTION", input.visual_description);
        payload.urls("USER_PROVIDED_URLS", &merged_urls(input));
        if let Some(markup) = input.current_markup.filter(|m| !m.trim().is_empty()) {
            payload.block("CURRENT_PAGE_HTML_CLEANED", &truncate_current_html(markup, self.limits.current_html_budget));
        }
        payload.block_opt("PLAN", input.plan);
        self.step_htmls(&mut payload, input.snapshots);
        payload.finish()
    }

    fn step_htmls(&self, payload: &mut Sections, snapshots: &[Snapshot]) {
        if snapshots.is_empty() {
            return;
        }
        payload.block("STEP_HTMLS_CLEANED", &build_step_htmls(snapshots, self.limits.step_htmls_budget));
    }
}

fn plan_payload(mode: PayloadMode, input: &PayloadInput<'_>) -> String {
    let mut payload = Sections::new(mode);
    payload.line_opt("CURRENT_PAGE_URL", page_url(input.current_url));
    payload.line_opt("USER_PROVIDED_URL", extract_first_url(input.instructions).as_deref());
    payload.urls("USER_PROVIDED_URLS", &extract_labeled_urls(input.instructions));
    payload.flag("SAME_PAGE_OPERATION", is_same_page_operation(input.instructions));
    payload.finish()
}

/// Driver URL as-is, unless blank or the empty placeholder page.
fn page_url(url: &str) -> Option<&str> {
    let trimmed = url.trim();
    (!trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("about:blank")).then_some(trimmed)
}

fn merged_urls(input: &PayloadInput<'_>) -> LabeledUrls {
    let base = extract_labeled_urls(input.instructions);
    match input.refine_hint {
        Some(hint) => merge_labeled_urls(base, extract_labeled_urls(hint)),
        None => base,
    }
}

fn truncate_current_html(markup: &str, budget: usize) -> String {
    if markup.chars().count() <= budget {
        return markup.to_string();
    }
    let mut cut: String = markup.chars().take(budget).collect();
    cut.push_str(CURRENT_HTML_TRUNCATION_MARKER);
    cut
}

/// Accumulates payload sections in order.
struct Sections {
    lines: Vec<String>,
}

impl Sections {
    fn new(mode: PayloadMode) -> Self {
        Self { lines: vec![format!("MODE: {mode}")] }
    }

    fn line_opt(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.lines.push(format!("{key}: {value}"));
        }
    }

    fn block(&mut self, key: &str, body: &str) {
        self.lines.push(format!("{key}:\n{body}"));
    }

    fn block_opt(&mut self, key: &str, body: Option<&str>) {
        if let Some(body) = body.filter(|b| !b.trim().is_empty()) {
            self.block(key, body.trim_end());
        }
    }

    fn urls(&mut self, key: &str, urls: &LabeledUrls) {
        if urls.is_empty() {
            return;
        }
        match serde_json::to_string(urls) {
            Ok(json) => self.lines.push(format!("{key}: {json}")),
            Err(err) => tracing::warn!(error = %err, "failed to render labeled urls"),
        }
    }

    fn flag(&mut self, key: &str, set: bool) {
        if set {
            self.lines.push(format!("{key}: true"));
        }
    }

    fn finish(self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagectx_core::CaptureMode;

    fn snap(step: u32, url: &str, markup: &str) -> Snapshot {
        Snapshot {
            step_index: step,
            url: url.to_string(),
            entry_action: String::new(),
            capture_mode: CaptureMode::RawHtml,
            cache_key: String::new(),
            compacted_markup: markup.to_string(),
        }
    }

    fn labels(payload: &str) -> Vec<&str> {
        payload
            .lines()
            .filter_map(|line| line.split_once(':').map(|(key, _)| key))
            .filter(|key| !key.is_empty() && key.chars().all(|c| c.is_ascii_uppercase() || c == '_'))
            .collect()
    }

    #[test]
    fn test_mode_round_trip() {
        for mode in PayloadMode::ALL {
            assert_eq!(mode.as_str().parse::<PayloadMode>().unwrap(), mode);
        }
        assert_eq!("codegen".parse::<PayloadMode>().unwrap(), PayloadMode::Codegen);
        assert!("PLAN".parse::<PayloadMode>().is_err());
        assert_eq!(serde_json::to_string(&PayloadMode::RefineCode).unwrap(), "\"REFINE_CODE\"");
    }

    #[test]
    fn test_plan_only_sections() {
        let input = PayloadInput {
            current_url: "https://a.com/home",
            instructions: "Log in at https://a.com/login and check orders.\nOrders page: https://a.com/orders\nDo it on the same page.",
            ..Default::default()
        };
        let payload = PayloadAssembler::default().plan_only(&input);

        assert_eq!(
            labels(&payload),
            vec!["MODE", "CURRENT_PAGE_URL", "USER_PROVIDED_URL", "USER_PROVIDED_URLS", "SAME_PAGE_OPERATION"]
        );
        assert!(payload.starts_with("MODE: PLAN_ONLY\n"));
        assert!(payload.contains("CURRENT_PAGE_URL: https://a.com/home"));
        assert!(payload.contains("USER_PROVIDED_URL: https://a.com/login"));
        assert!(payload.contains(r#"USER_PROVIDED_URLS: {"Orders page":"https://a.com/orders"}"#));
        assert!(payload.contains("SAME_PAGE_OPERATION: true"));
    }

    #[test]
    fn test_plan_entry_differs_only_by_mode() {
        let input = PayloadInput { current_url: "https://a.com", instructions: "open https://b.com", ..Default::default() };
        let assembler = PayloadAssembler::default();
        let only = assembler.plan_only(&input);
        let entry = assembler.plan_entry(&input);
        assert_eq!(only.replacen("PLAN_ONLY", "PLAN_ENTRY", 1), entry);
    }

    #[test]
    fn test_plan_omits_absent_sections() {
        let input = PayloadInput { current_url: "about:blank", instructions: "search for shoes", ..Default::default() };
        assert_eq!(PayloadAssembler::default().plan_only(&input), "MODE: PLAN_ONLY");
    }

    #[test]
    fn test_plan_refine_sections() {
        let input = PayloadInput {
            current_url: "https://a.com/cart",
            instructions: "Cart: https://a.com/cart",
            refine_hint: Some("Use the checkout at https://a.com/checkout instead\nCheckout: https://a.com/checkout\ncart again: https://a.com/cart\nstay on this page"),
            visual_description: Some("A cart with two items."),
            ..Default::default()
        };
        let payload = PayloadAssembler::default().plan_refine(&input);

        assert_eq!(
            labels(&payload),
            vec![
                "MODE",
                "CURRENT_PAGE_URL",
                "VISUAL_DESCRIPTION",
                "USER_PROVIDED_URL",
                "USER_INPUT_RAW",
                "USER_PROVIDED_URLS",
                "SAME_PAGE_OPERATION"
            ]
        );
        assert!(payload.contains("VISUAL_DESCRIPTION:\nA cart with two items."));
        assert!(payload.contains("USER_PROVIDED_URL: https://a.com/checkout"));
        assert!(payload.contains("USER_INPUT_RAW:\nUse the checkout at https://a.com/checkout instead\n"));
        assert!(
            payload.contains(r#"USER_PROVIDED_URLS: {"Cart":"https://a.com/cart","Checkout":"https://a.com/checkout"}"#)
        );
        assert!(!payload.contains("\"cart again\""));
        assert!(payload.ends_with("SAME_PAGE_OPERATION: true"));
    }

    #[test]
    fn test_plan_refine_same_page_from_instructions() {
        let input = PayloadInput {
            instructions: "everything is on the current page",
            refine_hint: Some("click the second tab"),
            ..Default::default()
        };
        assert!(PayloadAssembler::default().plan_refine(&input).contains("SAME_PAGE_OPERATION: true"));
    }

    #[test]
    fn test_plan_refine_keeps_hint_verbatim() {
        let hint = "  press Enter twice  \n\n";
        let input = PayloadInput { refine_hint: Some(hint), ..Default::default() };
        let payload = PayloadAssembler::default().plan_refine(&input);
        assert_eq!(payload, format!("MODE: PLAN_REFINE\nUSER_INPUT_RAW:\n{hint}"));
    }

    #[test]
    fn test_user_provided_urls_in_written_order() {
        let input = PayloadInput {
            instructions: "Search: https://z.com/search\nAccount: https://a.com/account",
            refine_hint: Some("Billing: https://b.com/billing"),
            ..Default::default()
        };
        let payload = PayloadAssembler::default().refine_code(&input);
        assert!(payload.contains(
            r#"USER_PROVIDED_URLS: {"Search":"https://z.com/search","Account":"https://a.com/account","Billing":"https://b.com/billing"}"#
        ));
    }

    #[test]
    fn test_codegen_sections_and_duplicates() {
        let snapshots = [
            snap(1, "https://a.com/p", "<div id=\"one\">first</div>"),
            snap(2, "https://a.com/q", "<div>second</div>"),
            snap(3, "https://a.com/p", "<div>third</div>"),
        ];
        let input = PayloadInput {
            current_url: "https://a.com/p?tab=2",
            plan: Some("1. open p\n2. click"),
            visual_description: Some("Product page"),
            snapshots: &snapshots,
            ..Default::default()
        };
        let payload = PayloadAssembler::default().codegen(&input);

        assert!(payload.starts_with("MODE: CODEGEN\nCURRENT_PAGE_URL: https://a.com/p\nVISUAL_DESCRIPTION:\nProduct page\nPLAN:\n1. open p\n2. click\nSTEP_HTMLS_CLEANED:\n"));
        assert!(payload.contains("<div id=\"one\">first</div>"));
        assert!(payload.contains("DUPLICATE_URL: SAME_AS_STEP 1"));
        assert!(!payload.contains("third"));
    }

    #[test]
    fn test_codegen_without_snapshots() {
        let input = PayloadInput { current_url: "https://a.com", plan: Some("click"), ..Default::default() };
        assert_eq!(
            PayloadAssembler::default().codegen(&input),
            "MODE: CODEGEN\nCURRENT_PAGE_URL: https://a.com\nPLAN:\nclick"
        );
    }

    #[test]
    fn test_codegen_budget() {
        let big = "y".repeat(400_000);
        let snapshots = [snap(1, "https://a.com/1", &big), snap(2, "https://a.com/2", &big)];
        let input = PayloadInput { snapshots: &snapshots, ..Default::default() };
        let payload = PayloadAssembler::new(PayloadLimits { step_htmls_budget: 500_000, current_html_budget: 10 })
            .codegen(&input);

        let (_, section) = payload.split_once("STEP_HTMLS_CLEANED:\n").unwrap();
        assert!(section.chars().count() <= 500_000 + STEP_HTMLS_TRUNCATION_MARKER.chars().count());
        assert!(section.ends_with(STEP_HTMLS_TRUNCATION_MARKER));
    }

    #[test]
    fn test_refine_code_sections() {
        let snapshots = [snap(1, "https://a.com/form", "<form id=\"f\"></form>")];
        let input = PayloadInput {
            current_url: "https://a.com/form?step=2",
            instructions: "Form: https://a.com/form",
            refine_hint: Some("Help: https://a.com/help"),
            plan: Some("fill the form"),
            visual_description: Some("A form"),
            current_markup: Some("<input id=\"email\">"),
            snapshots: &snapshots,
        };
        let payload = PayloadAssembler::default().refine_code(&input);

        assert_eq!(
            labels(&payload),
            vec![
                "MODE",
                "CURRENT_PAGE_URL",
                "VISUAL_DESCRIPTION",
                "USER_PROVIDED_URLS",
                "CURRENT_PAGE_HTML_CLEANED",
                "PLAN",
                "STEP_HTMLS_CLEANED"
            ]
        );
        assert!(payload.contains("CURRENT_PAGE_URL: https://a.com/form\n"));
        assert!(payload.contains(r#"{"Form":"https://a.com/form","Help":"https://a.com/help"}"#));
        assert!(payload.contains("CURRENT_PAGE_HTML_CLEANED:\n<input id=\"email\">\n"));
    }

    #[test]
    fn test_refine_code_truncates_current_html() {
        let markup = "z".repeat(50);
        let input = PayloadInput { current_markup: Some(&markup), ..Default::default() };
        let payload = PayloadAssembler::new(PayloadLimits { step_htmls_budget: 100, current_html_budget: 20 })
            .refine_code(&input);
        assert!(payload.contains(&format!("CURRENT_PAGE_HTML_CLEANED:\n{}{}", "z".repeat(20), CURRENT_HTML_TRUNCATION_MARKER)));
        assert!(!payload.contains(&"z".repeat(21)));
    }

    #[test]
    fn test_assemble_dispatches() {
        let input = PayloadInput::default();
        let assembler = PayloadAssembler::default();
        for mode in PayloadMode::ALL {
            assert_eq!(assembler.assemble(mode, &input), format!("MODE: {mode}"));
        }
    }

    #[test]
    fn test_limits_from_config() {
        let config = AppConfig { step_htmls_budget: 1234, ..Default::default() };
        let limits = PayloadLimits::from(&config);
        assert_eq!(limits.step_htmls_budget, 1234);
        assert_eq!(limits.current_html_budget, 200_000);
    }
}
