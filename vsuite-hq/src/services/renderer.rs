//! Document content renderer.
//!
//! Pure functions that turn a template plus a values map into formatted
//! document text. Rendering is deterministic: identical inputs always
//! produce byte-identical output.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::models::{FieldDef, FieldType, Template};

/// Render a document from a template and a values map.
///
/// Templates carrying legacy raw `content` get literal `{{name}}`
/// substitution; unmatched placeholders are left as-is. Otherwise the
/// document is synthesized from the template's ordered field list.
pub fn render(template: &Template, values: &Map<String, Value>, title: &str) -> String {
    if let Some(content) = template.content.as_deref() {
        if !content.trim().is_empty() {
            return substitute(content, values);
        }
    }

    let mut out = String::new();
    out.push_str(&format!("# {}\n", title));

    for field in template.fields() {
        out.push('\n');
        render_field(&mut out, &field, values.get(&field.name));
    }

    out
}

/// Literal `{{name}}` substitution over legacy template content.
fn substitute(content: &str, values: &Map<String, Value>) -> String {
    let mut result = content.to_string();
    for (name, value) in values {
        let placeholder = format!("{{{{{}}}}}", name);
        result = result.replace(&placeholder, &value_to_string(value));
    }
    result
}

fn render_field(out: &mut String, field: &FieldDef, value: Option<&Value>) {
    let value = value.or(field.default_value.as_ref());

    match field.field_type {
        FieldType::LineItems => render_line_items(out, &field.label, value),
        FieldType::Number => {
            out.push_str(&format!("## {}\n\n", field.label));
            match value.and_then(parse_decimal) {
                Some(amount) => {
                    out.push_str(&format!("Amount: ${}\n", format_currency(amount)))
                }
                None => out.push_str("Amount: Not specified\n"),
            }
        }
        FieldType::Date => {
            out.push_str(&format!("## {}\n\n", field.label));
            let text = value.map(value_to_string).unwrap_or_default();
            if text.trim().is_empty() {
                out.push_str("Not specified\n");
            } else {
                out.push_str(&format!("{}\n", format_long_date(&text)));
            }
        }
        FieldType::Text
        | FieldType::Textarea
        | FieldType::Email
        | FieldType::Phone => {
            out.push_str(&format!("## {}\n\n", field.label));
            let text = value.map(value_to_string).unwrap_or_default();
            out.push_str(&format!("{}\n", text));
        }
    }
}

/// Render a line-item table with a computed grand total.
fn render_line_items(out: &mut String, label: &str, value: Option<&Value>) {
    out.push_str(&format!("## {}\n\n", label));

    let items = match value {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => {
            out.push_str("_No line items specified._\n");
            return;
        }
    };

    out.push_str("| Description | Quantity | Unit Cost | Amount |\n");
    out.push_str("| --- | --- | --- | --- |\n");

    let mut total = Decimal::ZERO;
    for item in items {
        let description = item
            .get("description")
            .map(value_to_string)
            .unwrap_or_default();
        let quantity = item
            .get("quantity")
            .and_then(parse_decimal)
            .unwrap_or(Decimal::ZERO);
        let cost = item
            .get("cost")
            .and_then(parse_decimal)
            .unwrap_or(Decimal::ZERO);
        let amount = quantity * cost;
        total += amount;

        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            description,
            format_currency(quantity),
            format_currency(cost),
            format_currency(amount),
        ));
    }

    out.push_str(&format!("\n**Total: ${}**\n", format_currency(total)));
}

/// Free-form proposal content assembled without a template.
#[derive(Debug, Clone, Default)]
pub struct DirectContent {
    pub project_description: String,
    pub total_budget: Option<Decimal>,
    pub timeline: String,
    pub deliverables: String,
    pub terms: String,
    pub line_items: Vec<Value>,
    pub calculated_total: Option<Decimal>,
}

/// Render a proposal document from direct-mode fields.
pub fn render_direct(title: &str, content: &DirectContent) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n", title));

    out.push_str("\n## Project Description\n\n");
    out.push_str(&format!("{}\n", content.project_description));

    out.push_str("\n## Budget\n\n");
    match content.total_budget {
        Some(budget) => out.push_str(&format!("Amount: ${}\n", format_currency(budget))),
        None => out.push_str("Amount: Not specified\n"),
    }

    out.push_str("\n## Timeline\n\n");
    out.push_str(&format!("{}\n", content.timeline));

    out.push_str("\n## Deliverables\n\n");
    out.push_str(&format!("{}\n", content.deliverables));

    if !content.line_items.is_empty() {
        out.push('\n');
        render_line_items(
            &mut out,
            "Line Items",
            Some(&Value::Array(content.line_items.clone())),
        );
        if let Some(calculated) = content.calculated_total {
            out.push_str(&format!(
                "\n**Quoted Total: ${}**\n",
                format_currency(calculated)
            ));
        }
    }

    out.push_str("\n## Terms\n\n");
    out.push_str(&format!("{}\n", content.terms));

    out
}

/// Format a monetary amount to 2 decimal places with thousands separators.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative();
    let text = rounded.abs().to_string();

    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i.to_string(), format!("{:0<2}", f)),
        None => (text, "00".to_string()),
    };
    let frac_part = &frac_part[..2];

    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*digit);
    }

    let sign = if negative { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// Format a date value in long form, e.g. `March 5, 2026`.
/// Unparseable values pass through untouched.
fn format_long_date(value: &str) -> String {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.format("%B %-d, %Y").to_string();
    }
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(value) {
        return datetime.format("%B %-d, %Y").to_string();
    }
    value.to_string()
}

/// Parse a decimal out of a JSON number or string (allowing `$`/`,`).
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().trim_start_matches('$').replace(',', "").parse().ok(),
        _ => None,
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn template(content: Option<&str>, variables: Value) -> Template {
        Template {
            template_id: Uuid::new_v4(),
            name: "test".to_string(),
            doc_type: "proposal".to_string(),
            description: None,
            content: content.map(|s| s.to_string()),
            variables,
            is_system: false,
            is_public: false,
            created_by: Uuid::new_v4(),
            tags: serde_json::json!([]),
            metadata: None,
            created_utc: Utc::now(),
        }
    }

    fn values(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn rendering_is_idempotent() {
        let template = template(
            None,
            serde_json::json!([
                {"name": "budget", "label": "Budget", "type": "number"},
                {"name": "start", "label": "Start Date", "type": "date"},
            ]),
        );
        let vals = values(serde_json::json!({"budget": 1500, "start": "2026-03-05"}));

        let first = render(&template, &vals, "Website Build");
        let second = render(&template, &vals, "Website Build");
        assert_eq!(first, second);
    }

    #[test]
    fn number_field_renders_currency_amount() {
        let template = template(
            None,
            serde_json::json!([{"name": "budget", "label": "Budget", "type": "number"}]),
        );
        let vals = values(serde_json::json!({"budget": 1500}));

        let rendered = render(&template, &vals, "Proposal");
        assert!(rendered.contains("Amount:"));
        assert!(rendered.contains("1,500.00"));
    }

    #[test]
    fn line_items_table_totals_quantity_times_cost() {
        let template = template(
            None,
            serde_json::json!([{"name": "items", "label": "Line Items", "type": "line_items"}]),
        );
        let vals = values(serde_json::json!({
            "items": [
                {"description": "Design", "quantity": 2, "cost": 500},
                {"description": "Hosting", "quantity": 1, "cost": 99.5},
            ]
        }));

        let rendered = render(&template, &vals, "Proposal");
        assert!(rendered.contains("| Design | 2.00 | 500.00 | 1,000.00 |"));
        assert!(rendered.contains("**Total: $1,099.50**"));
    }

    #[test]
    fn empty_line_items_render_a_notice() {
        let template = template(
            None,
            serde_json::json!([{"name": "items", "label": "Line Items", "type": "line_items"}]),
        );
        let vals = values(serde_json::json!({"items": []}));

        let rendered = render(&template, &vals, "Proposal");
        assert!(rendered.contains("_No line items specified._"));
        assert!(!rendered.contains("| Description |"));
    }

    #[test]
    fn legacy_content_substitutes_placeholders_literally() {
        let template = template(Some("Dear {{client}}, budget is {{budget}}. {{missing}}"),
            serde_json::json!([]));
        let vals = values(serde_json::json!({"client": "Acme", "budget": 1500}));

        let rendered = render(&template, &vals, "ignored");
        assert_eq!(rendered, "Dear Acme, budget is 1500. {{missing}}");
    }

    #[test]
    fn empty_date_renders_not_specified() {
        let template = template(
            None,
            serde_json::json!([{"name": "start", "label": "Start Date", "type": "date"}]),
        );

        let rendered = render(&template, &values(serde_json::json!({"start": ""})), "P");
        assert!(rendered.contains("Not specified"));

        let rendered = render(&template, &values(serde_json::json!({})), "P");
        assert!(rendered.contains("Not specified"));
    }

    #[test]
    fn date_renders_long_form() {
        let template = template(
            None,
            serde_json::json!([{"name": "start", "label": "Start Date", "type": "date"}]),
        );
        let vals = values(serde_json::json!({"start": "2026-03-05"}));

        let rendered = render(&template, &vals, "P");
        assert!(rendered.contains("March 5, 2026"));
    }

    #[test]
    fn currency_formatting_groups_thousands() {
        assert_eq!(format_currency("1234567.5".parse().unwrap()), "1,234,567.50");
        assert_eq!(format_currency("0".parse().unwrap()), "0.00");
        assert_eq!(format_currency("999".parse().unwrap()), "999.00");
        assert_eq!(format_currency("1000".parse().unwrap()), "1,000.00");
        assert_eq!(format_currency("-1500".parse().unwrap()), "-1,500.00");
    }

    #[test]
    fn parse_decimal_handles_numbers_and_formatted_strings() {
        assert_eq!(
            parse_decimal(&serde_json::json!(1500)),
            Some("1500".parse().unwrap())
        );
        assert_eq!(
            parse_decimal(&serde_json::json!("$1,500.00")),
            Some("1500.00".parse().unwrap())
        );
        assert_eq!(parse_decimal(&serde_json::json!(null)), None);
        assert_eq!(parse_decimal(&serde_json::json!("not a number")), None);
    }

    #[test]
    fn direct_mode_renders_all_sections() {
        let content = DirectContent {
            project_description: "Build a site".to_string(),
            total_budget: Some("12500".parse().unwrap()),
            timeline: "6 weeks".to_string(),
            deliverables: "Site, docs".to_string(),
            terms: "Net 30".to_string(),
            line_items: vec![serde_json::json!({"description": "Build", "quantity": 1, "cost": 12500})],
            calculated_total: Some("12500".parse().unwrap()),
        };

        let rendered = render_direct("Site Proposal", &content);
        assert!(rendered.contains("# Site Proposal"));
        assert!(rendered.contains("Amount: $12,500.00"));
        assert!(rendered.contains("## Terms"));
        assert!(rendered.contains("**Total: $12,500.00**"));

        let again = render_direct("Site Proposal", &content);
        assert_eq!(rendered, again);
    }
}
