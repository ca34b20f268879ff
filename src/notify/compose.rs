//! Email bodies for the operations inbox and the submitter.

use crate::config::NotifyConfig;
use crate::notify::OutgoingEmail;
use crate::pipeline::types::StoredLead;

const NOT_GIVEN: &str = "N/A";
const NO_TAG: &str = "—";

/// Escape text for interpolation into HTML element content or attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Subject lines go into a header; control characters never do.
fn subject_line(raw: String) -> String {
    raw.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

fn first_name(full_name: &str) -> &str {
    full_name.split_whitespace().next().unwrap_or(full_name)
}

/// Label/value rows summarising a lead, in display order.
fn summary_rows(lead: &StoredLead) -> Vec<(&'static str, String)> {
    let or = |v: &Option<String>, fallback: &str| v.clone().unwrap_or_else(|| fallback.into());
    vec![
        ("Name", lead.full_name.clone()),
        ("Work Email", lead.work_email.clone()),
        ("Phone / WhatsApp", or(&lead.phone_whatsapp, NOT_GIVEN)),
        ("Company", lead.company_name.clone()),
        ("Stage", lead.current_stage.label().to_string()),
        ("Primary Goal", lead.primary_goal.clone()),
        ("Deck / Website", or(&lead.deck_or_website, NOT_GIVEN)),
        ("Request Type", lead.request_type.clone()),
        ("Source Page", or(&lead.source_page, NOT_GIVEN)),
        ("IP", lead.ip_address.clone()),
        ("User Agent", lead.user_agent.clone()),
        ("UTM Source", or(&lead.utm.utm_source, NO_TAG)),
        ("UTM Medium", or(&lead.utm.utm_medium, NO_TAG)),
        ("UTM Campaign", or(&lead.utm.utm_campaign, NO_TAG)),
        ("UTM Term", or(&lead.utm.utm_term, NO_TAG)),
        ("UTM Content", or(&lead.utm.utm_content, NO_TAG)),
    ]
}

/// Summary of a new lead for the operations inbox.
pub fn operations_email(lead: &StoredLead, config: &NotifyConfig) -> OutgoingEmail {
    let title = format!(
        "New {} Diagnostic Request — {}",
        config.brand, lead.company_name
    );
    let submitted_at = lead.created_at.to_rfc3339();
    let rows = summary_rows(lead);

    let table_rows: String = rows
        .iter()
        .map(|(label, value)| {
            format!(
                "<tr><td style=\"padding: 6px 0; font-weight: 600;\">{label}</td><td>{}</td></tr>\n",
                escape_html(value)
            )
        })
        .collect();

    let html = format!(
        "<div style=\"font-family: 'Inter', system-ui, -apple-system; color: #0b0c10;\">\n\
         <h2 style=\"margin: 0 0 12px;\">{}</h2>\n\
         <p style=\"margin: 0 0 16px; color: #1f2933;\">Submitted at {submitted_at}</p>\n\
         <table style=\"border-collapse: collapse; width: 100%; font-size: 14px;\"><tbody>\n\
         {table_rows}</tbody></table>\n\
         </div>",
        escape_html(&title)
    );

    let mut text = vec![title.clone(), format!("Submitted: {submitted_at}")];
    text.extend(rows.iter().map(|(label, value)| format!("{label}: {value}")));

    OutgoingEmail {
        from: config.from.clone(),
        to: config.operations_to.clone(),
        subject: subject_line(title),
        html,
        text: Some(text.join("\n")),
    }
}

/// Acknowledgement sent back to the person who filled in the form.
pub fn acknowledgement_email(lead: &StoredLead, config: &NotifyConfig) -> OutgoingEmail {
    let name = first_name(&lead.full_name);
    let brand = &config.brand;

    let html = format!(
        "<div style=\"font-family: sans-serif; max-width: 600px; color: #333;\">\n\
         <h2 style=\"color: #000;\">We received your request.</h2>\n\
         <p>Hi {},</p>\n\
         <p>Thanks for applying for a diagnostic session for <strong>{}</strong>.</p>\n\
         <p>Our partners review applications daily. If your stage and goals align with our sprint capacity, \
         we will contact you via email or WhatsApp within 24 hours to schedule the audit.</p>\n\
         <br>\n\
         <p>Best,</p>\n\
         <p><strong>The {} Team</strong></p>\n\
         </div>",
        escape_html(name),
        escape_html(&lead.company_name),
        escape_html(brand),
    );

    let text = format!(
        "Hi {name},\n\n\
         Thanks for applying for a diagnostic session for {}.\n\n\
         Our partners review applications daily. If your stage and goals align with our sprint capacity, \
         we will contact you via email or WhatsApp within 24 hours to schedule the audit.\n\n\
         Best,\nThe {brand} Team",
        lead.company_name
    );

    OutgoingEmail {
        from: config.from.clone(),
        to: lead.work_email.clone(),
        subject: subject_line(format!("Request Received: {brand} Diagnostic")),
        html,
        text: Some(text),
    }
}
