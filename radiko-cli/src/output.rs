use crate::{cli::OutputFormat, error::Result};
#[cfg(feature = "colored-output")]
use colored::*;
use radiko_engine::auth::AREAS;
use radiko_engine::rules::{HeaderMutation, HeaderOperation};
use radiko_engine::{AuthSummary, DownloadOutcome, InjectionRule, StatusReport};
use serde::Serialize;
use serde_json::json;
use std::fmt::Write as _;

pub struct OutputManager {
    format: OutputFormat,
    #[cfg_attr(not(feature = "colored-output"), allow(dead_code))]
    colored: bool,
}

impl OutputManager {
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self { format, colored }
    }

    fn json<T: Serialize>(value: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(value)?)
    }

    fn heading(&self, text: &str) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                return text.green().bold().to_string();
            }
        }
        text.to_string()
    }

    fn label(&self, text: &str) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                return text.yellow().to_string();
            }
        }
        text.to_string()
    }

    pub fn status(&self, report: &StatusReport) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(report);
        }

        let mut out = String::new();
        let _ = writeln!(out, "{}", self.heading("Session:"));
        let token = match &report.token_prefix {
            Some(prefix) => format!("{prefix}…"),
            None => "none".to_string(),
        };
        let _ = writeln!(out, "  {}: {token}", self.label("Token"));
        let _ = writeln!(
            out,
            "  {}: {}",
            self.label("Area"),
            report.area_id.as_deref().unwrap_or("unknown")
        );
        if let Some(info) = &report.area_info {
            let _ = writeln!(out, "  {}: {info}", self.label("Area info"));
        }
        if let Some(age) = report.token_age_ms {
            let _ = writeln!(out, "  {}: {} min", self.label("Token age"), age / 60_000);
        }
        let _ = writeln!(out, "  {}: {}", self.label("Rules"), report.rule_count);
        Ok(out)
    }

    pub fn auth(&self, summary: &AuthSummary) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(summary);
        }
        Ok(format!(
            "{} area {} ({}), token {}…\n",
            self.heading("Authenticated:"),
            summary.area_id,
            summary.area_info,
            summary.token_prefix
        ))
    }

    pub fn rules(&self, rules: &[InjectionRule]) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(&rules);
        }

        let mut out = String::new();
        let _ = writeln!(out, "{} {}", self.heading("Rules:"), rules.len());
        for rule in rules {
            let _ = writeln!(
                out,
                "  #{:<4} p{} {}",
                rule.id, rule.priority, rule.url_filter
            );
            for mutation in &rule.request_headers {
                let _ = writeln!(out, "         {}", describe(mutation));
            }
        }
        Ok(out)
    }

    pub fn headers(&self, url: &str, mutations: &[HeaderMutation]) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(&json!({ "url": url, "headers": mutations }));
        }

        let mut out = format!("{} {url}\n", self.heading("Headers for"));
        if mutations.is_empty() {
            out.push_str("  (no matching rules)\n");
        }
        for mutation in mutations {
            let _ = writeln!(out, "  {}", describe(mutation));
        }
        Ok(out)
    }

    pub fn areas(&self) -> Result<String> {
        if self.format == OutputFormat::Json {
            let areas: Vec<_> = AREAS
                .iter()
                .map(|a| json!({ "id": a.id, "name": a.name }))
                .collect();
            return Self::json(&areas);
        }

        let mut out = String::new();
        for area in AREAS {
            let _ = writeln!(out, "{}  {}", self.label(area.id), area.name);
        }
        Ok(out)
    }

    pub fn download(&self, outcome: &DownloadOutcome) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(outcome);
        }
        Ok(format!(
            "{} {} ({} segments, {} bytes)\n",
            self.heading("Saved"),
            outcome.path.display(),
            outcome.segments,
            outcome.bytes
        ))
    }
}

fn describe(mutation: &HeaderMutation) -> String {
    match (mutation.operation, &mutation.value) {
        (HeaderOperation::Set, Some(value)) => {
            format!("set {}: {}", mutation.header, mask(&mutation.header, value))
        }
        (HeaderOperation::Set, None) => format!("set {}", mutation.header),
        (HeaderOperation::Remove, _) => format!("remove {}", mutation.header),
    }
}

/// Tokens are printed as a prefix only.
fn mask(header: &str, value: &str) -> String {
    if header.eq_ignore_ascii_case("X-Radiko-AuthToken") && value.len() > 8 {
        let prefix: String = value.chars().take(8).collect();
        format!("{prefix}…")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_masked() {
        let mutation = HeaderMutation::set("X-Radiko-AuthToken", "abcdefghijklmnop");
        assert_eq!(describe(&mutation), "set X-Radiko-AuthToken: abcdefgh…");

        let mutation = HeaderMutation::set("X-Radiko-AreaId", "JP13");
        assert_eq!(describe(&mutation), "set X-Radiko-AreaId: JP13");
    }

    #[test]
    fn test_status_json() {
        let output = OutputManager::new(OutputFormat::Json, false);
        let report = StatusReport {
            token_present: true,
            token_prefix: Some("abcdefgh".into()),
            area_id: Some("JP13".into()),
            area_info: None,
            token_age_ms: Some(120_000),
            rule_count: 0,
            rules: Vec::new(),
        };
        let value: serde_json::Value = serde_json::from_str(&output.status(&report).unwrap()).unwrap();
        assert_eq!(value["token_prefix"], "abcdefgh");
        assert_eq!(value["rule_count"], 0);
    }

    #[test]
    fn test_status_pretty_without_token() {
        let output = OutputManager::new(OutputFormat::Pretty, false);
        let report = StatusReport {
            token_present: false,
            token_prefix: None,
            area_id: None,
            area_info: None,
            token_age_ms: None,
            rule_count: 0,
            rules: Vec::new(),
        };
        let text = output.status(&report).unwrap();
        assert!(text.contains("Token: none"));
        assert!(text.contains("Area: unknown"));
    }
}
