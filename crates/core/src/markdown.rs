//! Markdown rendering of a template.
//!
//! Stateless: the caller loads the template tree and hands over a
//! [`Document`] built from it.
//!
//! ```text
//! # <template name>
//!
//! <template description>
//!
//! ---
//!
//! ## <category name>
//!
//! ### <icon> <rule title>
//!
//! **<allowed line>**
//! ...
//! ```

use crate::rule::RuleContent;

/// A template ready to render.
#[derive(Debug, Clone)]
pub struct Document<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub sections: Vec<Section<'a>>,
}

/// One category of a template, with its rules in order.
#[derive(Debug, Clone)]
pub struct Section<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub rules: Vec<RuleContent>,
}

impl Document<'_> {
    pub fn category_count(&self) -> usize {
        self.sections.len()
    }

    pub fn rule_count(&self) -> usize {
        self.sections.iter().map(|s| s.rules.len()).sum()
    }
}

const SEPARATOR: &str = "---\n\n";

/// Suggested download filename for a rendered template.
pub fn filename(template_name: &str) -> String {
    format!("{template_name}.md")
}

/// Render a document to Markdown.
pub fn render(doc: &Document<'_>) -> String {
    let mut md = format!("# {}\n\n", doc.name);
    push_paragraph(&mut md, doc.description);
    md.push_str(SEPARATOR);

    for section in &doc.sections {
        md.push_str(&format!("## {}\n\n", section.name));
        push_paragraph(&mut md, section.description);

        for rule in &section.rules {
            render_rule(&mut md, rule);
        }
    }

    md
}

fn render_rule(md: &mut String, rule: &RuleContent) {
    let allowed = if rule.allowed {
        "\u{2705} Allowed"
    } else {
        "\u{274C} Not allowed"
    };

    md.push_str(&format!("### {} {}\n\n", rule.priority.icon(), rule.title));
    md.push_str(&format!("**{allowed}**\n\n"));
    push_paragraph(md, Some(rule.description_detail.as_str()));

    if let Some(bad) = non_empty(rule.example_bad.as_deref()) {
        md.push_str("\u{274C} **Bad example:**\n\n");
        md.push_str(&format!("```\n{bad}\n```\n\n"));
    }
    if let Some(good) = non_empty(rule.example_good.as_deref()) {
        md.push_str("\u{2705} **Good example:**\n\n");
        md.push_str(&format!("```\n{good}\n```\n\n"));
    }
    if let Some(action) = non_empty(rule.violation_action.as_deref()) {
        md.push_str(&format!("**On violation:** {action}\n\n"));
    }
    if let Some(notes) = non_empty(rule.notes.as_deref()) {
        md.push_str(&format!("\u{1F4DD} **Note:** {notes}\n\n"));
    }

    md.push_str(SEPARATOR);
}

fn push_paragraph(md: &mut String, text: Option<&str>) {
    if let Some(text) = non_empty(text) {
        md.push_str(text);
        md.push_str("\n\n");
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.is_empty())
}
