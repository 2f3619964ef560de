use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::models::ApplicationRequirements;

/// Material links must be absolute http(s) URLs.
pub static HTTP_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://.+").expect("valid regex"));

struct TextRule {
    field: &'static str,
    label: &'static str,
    min: usize,
    max: usize,
}

const PROPOSAL: TextRule = TextRule { field: "proposal", label: "Proposal", min: 100, max: 5000 };
const BUDGET_BREAKDOWN: TextRule = TextRule { field: "budget_breakdown", label: "Budget breakdown", min: 50, max: 2000 };
const TIMELINE: TextRule = TextRule { field: "timeline", label: "Timeline", min: 20, max: 1000 };
const EXPECTED_IMPACT: TextRule = TextRule { field: "expected_impact", label: "Expected impact", min: 50, max: 2000 };
const TEAM_DETAILS: TextRule = TextRule { field: "team_details", label: "Team details", min: 20, max: 2000 };
const PROJECT_OVERVIEW: TextRule = TextRule { field: "project_overview", label: "Project overview", min: 50, max: 3000 };
const ROADMAP: TextRule = TextRule { field: "roadmap", label: "Roadmap", min: 50, max: 3000 };
const VISION_IMPACT: TextRule = TextRule { field: "vision_impact", label: "Vision and impact", min: 50, max: 2000 };
const WHY_GRANT: TextRule = TextRule { field: "why_grant", label: "Why this grant", min: 50, max: 2000 };

/// A grant application payload that passed every field rule.
///
/// Text is stored trimmed. Optional sections that were blank are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub program_id: Uuid,
    pub project_id: Uuid,
    pub proposal: String,
    pub budget_breakdown: String,
    pub timeline: String,
    pub expected_impact: Option<String>,
    pub team_details: Option<String>,
    pub project_overview: Option<String>,
    pub roadmap: Option<String>,
    pub vision_impact: Option<String>,
    pub why_grant: Option<String>,
    pub pitch_video_url: String,
    pub presentation_url: String,
    pub demo_video_url: Option<String>,
    pub additional_materials: Vec<String>,
    pub women_leadership_percentage: f64,
    pub working_prototype: bool,
    pub progress_duration_months: f64,
}

impl Submission {
    /// Checks every field rule and collects all violations. Never stops at the
    /// first one.
    pub fn parse(payload: &Value) -> Result<Self, Vec<String>> {
        let empty = Map::new();
        let body = payload.as_object().unwrap_or(&empty);
        let mut errors = Vec::new();

        let program_id = uuid_field(body, "program_id", "Program ID", &mut errors);
        let project_id = uuid_field(body, "project_id", "Project ID", &mut errors);

        let proposal = required_text(body, &PROPOSAL, &mut errors);
        let budget_breakdown = required_text(body, &BUDGET_BREAKDOWN, &mut errors);
        let timeline = required_text(body, &TIMELINE, &mut errors);

        let expected_impact = optional_text(body, &EXPECTED_IMPACT, &mut errors);
        let team_details = optional_text(body, &TEAM_DETAILS, &mut errors);
        let project_overview = optional_text(body, &PROJECT_OVERVIEW, &mut errors);
        let roadmap = optional_text(body, &ROADMAP, &mut errors);
        let vision_impact = optional_text(body, &VISION_IMPACT, &mut errors);
        let why_grant = optional_text(body, &WHY_GRANT, &mut errors);

        let pitch_video_url = required_url(body, "pitch_video_url", "Pitch video URL", &mut errors);
        let presentation_url = required_url(body, "presentation_url", "Presentation URL", &mut errors);
        let demo_video_url = optional_url(body, "demo_video_url", "Demo video URL", &mut errors);
        let additional_materials = materials(body, &mut errors);

        let women_leadership_percentage = number_field(body, "women_leadership_percentage")
            .filter(|pct| (0.0..=100.0).contains(pct));
        if women_leadership_percentage.is_none() {
            errors.push("Women leadership percentage must be a number between 0 and 100".to_string());
        }

        let progress_duration_months = number_field(body, "progress_duration_months").filter(|months| *months >= 0.0);
        if progress_duration_months.is_none() {
            errors.push("Progress duration must be a non-negative number of months".to_string());
        }

        let working_prototype = bool_field(body, "working_prototype");
        if working_prototype.is_none() {
            errors.push("Working prototype must be true or false".to_string());
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        // Every None above pushed an error, so these are all present here.
        match (
            program_id,
            project_id,
            proposal,
            budget_breakdown,
            timeline,
            pitch_video_url,
            presentation_url,
            women_leadership_percentage,
            working_prototype,
            progress_duration_months,
        ) {
            (
                Some(program_id),
                Some(project_id),
                Some(proposal),
                Some(budget_breakdown),
                Some(timeline),
                Some(pitch_video_url),
                Some(presentation_url),
                Some(women_leadership_percentage),
                Some(working_prototype),
                Some(progress_duration_months),
            ) => Ok(Submission {
                program_id,
                project_id,
                proposal,
                budget_breakdown,
                timeline,
                expected_impact,
                team_details,
                project_overview,
                roadmap,
                vision_impact,
                why_grant,
                pitch_video_url,
                presentation_url,
                demo_video_url,
                additional_materials,
                women_leadership_percentage,
                working_prototype,
                progress_duration_months,
            }),
            _ => Err(vec!["Invalid application payload".to_string()]),
        }
    }

    /// Sections the program marks as mandatory must be present.
    pub fn check_requirements(&self, requirements: &ApplicationRequirements) -> Result<(), Vec<String>> {
        let sections = [
            (requirements.expected_impact, self.expected_impact.is_some(), EXPECTED_IMPACT.label),
            (requirements.team_details, self.team_details.is_some(), TEAM_DETAILS.label),
            (requirements.project_overview, self.project_overview.is_some(), PROJECT_OVERVIEW.label),
            (requirements.roadmap, self.roadmap.is_some(), ROADMAP.label),
            (requirements.vision_impact, self.vision_impact.is_some(), VISION_IMPACT.label),
            (requirements.why_grant, self.why_grant.is_some(), WHY_GRANT.label),
            (requirements.demo_video, self.demo_video_url.is_some(), "Demo video URL"),
        ];

        let errors: Vec<String> = sections
            .iter()
            .filter(|(required, present, _)| *required && !*present)
            .map(|(_, _, label)| format!("{} is required for this program", label))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Trimmed, non-blank string value. `Err` when present but not a string.
fn text_value<'a>(body: &'a Map<String, Value>, field: &str) -> Result<Option<&'a str>, ()> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok(if trimmed.is_empty() { None } else { Some(trimmed) })
        }
        Some(_) => Err(()),
    }
}

fn check_length(text: &str, rule: &TextRule, errors: &mut Vec<String>) -> bool {
    let len = text.chars().count();
    if len < rule.min || len > rule.max {
        errors.push(format!(
            "{} must be between {} and {} characters",
            rule.label, rule.min, rule.max
        ));
        return false;
    }
    true
}

fn required_text(body: &Map<String, Value>, rule: &TextRule, errors: &mut Vec<String>) -> Option<String> {
    match text_value(body, rule.field) {
        Ok(Some(text)) => check_length(text, rule, errors).then(|| text.to_string()),
        Ok(None) => {
            errors.push(format!("{} is required", rule.label));
            None
        }
        Err(()) => {
            errors.push(format!("{} must be text", rule.label));
            None
        }
    }
}

fn optional_text(body: &Map<String, Value>, rule: &TextRule, errors: &mut Vec<String>) -> Option<String> {
    match text_value(body, rule.field) {
        Ok(Some(text)) => check_length(text, rule, errors).then(|| text.to_string()),
        Ok(None) => None,
        Err(()) => {
            errors.push(format!("{} must be text", rule.label));
            None
        }
    }
}

fn url_error(label: &str) -> String {
    format!("{} must be a valid http(s) URL", label)
}

fn required_url(body: &Map<String, Value>, field: &str, label: &str, errors: &mut Vec<String>) -> Option<String> {
    match text_value(body, field) {
        Ok(Some(url)) if HTTP_URL.is_match(url) => Some(url.to_string()),
        Ok(None) => {
            errors.push(format!("{} is required", label));
            None
        }
        _ => {
            errors.push(url_error(label));
            None
        }
    }
}

fn optional_url(body: &Map<String, Value>, field: &str, label: &str, errors: &mut Vec<String>) -> Option<String> {
    match text_value(body, field) {
        Ok(Some(url)) if HTTP_URL.is_match(url) => Some(url.to_string()),
        Ok(None) => None,
        _ => {
            errors.push(url_error(label));
            None
        }
    }
}

fn materials(body: &Map<String, Value>, errors: &mut Vec<String>) -> Vec<String> {
    let items = match body.get("additional_materials") {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.push("Additional materials must be a list of URLs".to_string());
            return Vec::new();
        }
    };

    let mut urls = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match item.as_str().map(str::trim) {
            Some(url) if HTTP_URL.is_match(url) => urls.push(url.to_string()),
            _ => errors.push(url_error(&format!("Additional material {}", index + 1))),
        }
    }
    urls
}

fn uuid_field(body: &Map<String, Value>, field: &str, label: &str, errors: &mut Vec<String>) -> Option<Uuid> {
    match text_value(body, field) {
        Ok(Some(raw)) => match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                errors.push(format!("{} must be a valid id", label));
                None
            }
        },
        Ok(None) => {
            errors.push(format!("{} is required", label));
            None
        }
        Err(()) => {
            errors.push(format!("{} must be a valid id", label));
            None
        }
    }
}

/// JSON numbers and numeric strings; NaN and infinities are rejected.
fn number_field(body: &Map<String, Value>, field: &str) -> Option<f64> {
    let value = match body.get(field)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

fn bool_field(body: &Map<String, Value>, field: &str) -> Option<bool> {
    match body.get(field)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s == "true" => Some(true),
        Value::String(s) if s == "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_payload() -> Value {
        json!({
            "program_id": Uuid::new_v4().to_string(),
            "project_id": Uuid::new_v4().to_string(),
            "proposal": "p".repeat(100),
            "budget_breakdown": "b".repeat(50),
            "timeline": "t".repeat(20),
            "pitch_video_url": "https://video.example.com/pitch",
            "presentation_url": "http://slides.example.com/deck",
            "women_leadership_percentage": 60,
            "progress_duration_months": 6,
            "working_prototype": true
        })
    }

    fn errors_for(payload: Value) -> Vec<String> {
        Submission::parse(&payload).unwrap_err()
    }

    #[test]
    fn minimal_payload_passes() {
        let submission = Submission::parse(&valid_payload()).unwrap();
        assert_eq!(submission.proposal.len(), 100);
        assert_eq!(submission.women_leadership_percentage, 60.0);
        assert!(submission.working_prototype);
        assert!(submission.additional_materials.is_empty());
        assert!(submission.expected_impact.is_none());
    }

    #[test]
    fn proposal_length_boundaries() {
        for (len, ok) in [(99, false), (100, true), (5000, true), (5001, false)] {
            let mut payload = valid_payload();
            payload["proposal"] = json!("x".repeat(len));
            assert_eq!(Submission::parse(&payload).is_ok(), ok, "proposal of {} chars", len);
        }
    }

    #[test]
    fn lengths_are_measured_after_trimming() {
        let mut payload = valid_payload();
        payload["proposal"] = json!(format!("   {}   ", "x".repeat(99)));
        assert_eq!(
            errors_for(payload),
            vec!["Proposal must be between 100 and 5000 characters".to_string()]
        );
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        let mut payload = valid_payload();
        payload["proposal"] = json!("é".repeat(5000));
        assert!(Submission::parse(&payload).is_ok());
    }

    #[test]
    fn budget_and_timeline_bounds() {
        let mut payload = valid_payload();
        payload["budget_breakdown"] = json!("b".repeat(49));
        payload["timeline"] = json!("t".repeat(1001));
        let errors = errors_for(payload);
        assert!(errors.contains(&"Budget breakdown must be between 50 and 2000 characters".to_string()));
        assert!(errors.contains(&"Timeline must be between 20 and 1000 characters".to_string()));
    }

    #[test]
    fn every_violation_is_reported() {
        let errors = errors_for(json!({}));
        for expected in [
            "Program ID is required",
            "Project ID is required",
            "Proposal is required",
            "Budget breakdown is required",
            "Timeline is required",
            "Pitch video URL is required",
            "Presentation URL is required",
            "Women leadership percentage must be a number between 0 and 100",
            "Progress duration must be a non-negative number of months",
            "Working prototype must be true or false",
        ] {
            assert!(errors.contains(&expected.to_string()), "missing {:?} in {:?}", expected, errors);
        }
    }

    #[test]
    fn urls_need_a_scheme() {
        let mut payload = valid_payload();
        payload["pitch_video_url"] = json!("ftp://video.example.com");
        payload["presentation_url"] = json!("slides.example.com");
        payload["demo_video_url"] = json!("https://");
        let errors = errors_for(payload);
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&"Pitch video URL must be a valid http(s) URL".to_string()));
        assert!(errors.contains(&"Demo video URL must be a valid http(s) URL".to_string()));
    }

    #[test]
    fn each_additional_material_is_checked() {
        let mut payload = valid_payload();
        payload["additional_materials"] = json!(["https://a.example.com", "nope", 7]);
        let errors = errors_for(payload);
        assert_eq!(
            errors,
            vec![
                "Additional material 2 must be a valid http(s) URL".to_string(),
                "Additional material 3 must be a valid http(s) URL".to_string(),
            ]
        );
    }

    #[test]
    fn percentage_range_and_type() {
        for (value, ok) in [
            (json!(0), true),
            (json!(100), true),
            (json!("75.5"), true),
            (json!(-1), false),
            (json!(100.5), false),
            (json!("lots"), false),
            (json!(true), false),
        ] {
            let mut payload = valid_payload();
            payload["women_leadership_percentage"] = value.clone();
            assert_eq!(Submission::parse(&payload).is_ok(), ok, "percentage {}", value);
        }
    }

    #[test]
    fn months_and_prototype_types() {
        let mut payload = valid_payload();
        payload["progress_duration_months"] = json!(-0.5);
        payload["working_prototype"] = json!("yes");
        let errors = errors_for(payload);
        assert_eq!(errors.len(), 2);

        let mut payload = valid_payload();
        payload["progress_duration_months"] = json!(0);
        payload["working_prototype"] = json!("false");
        let submission = Submission::parse(&payload).unwrap();
        assert!(!submission.working_prototype);
    }

    #[test]
    fn optional_sections_checked_only_when_present() {
        let mut payload = valid_payload();
        payload["roadmap"] = json!("   ");
        payload["team_details"] = json!("too short");
        let errors = errors_for(payload);
        assert_eq!(errors, vec!["Team details must be between 20 and 2000 characters".to_string()]);
    }

    #[test]
    fn program_requirements_toggle_sections_on() {
        let mut payload = valid_payload();
        payload["why_grant"] = json!("w".repeat(50));
        let submission = Submission::parse(&payload).unwrap();

        let requirements = ApplicationRequirements {
            why_grant: true,
            roadmap: true,
            demo_video: true,
            ..Default::default()
        };
        let errors = submission.check_requirements(&requirements).unwrap_err();
        assert_eq!(
            errors,
            vec![
                "Roadmap is required for this program".to_string(),
                "Demo video URL is required for this program".to_string(),
            ]
        );

        assert!(submission.check_requirements(&ApplicationRequirements::default()).is_ok());
    }
}
