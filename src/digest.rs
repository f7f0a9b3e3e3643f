use chrono::NaiveDate;

use crate::models::{ContactSuggestion, TailoredResult};

const ACCENT: &str = "#0077b5";

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn subject_line(date: NaiveDate) -> String {
    format!("🔍 Your Top Jobs Today - {}", date.format("%B %d"))
}

fn render_contact(contact: &ContactSuggestion) -> String {
    format!(
        r#"
      <div style="background:#f0f7ff;border-left:3px solid {ACCENT};padding:10px;margin:8px 0;border-radius:4px;">
        <strong>🔗 {}</strong><br>
        <em>Why:</em> {}<br>
        <em>Find them:</em> LinkedIn search → <code>{}</code><br>
        <em>Message:</em> "{}"
      </div>"#,
        escape_html(&contact.profile_type),
        escape_html(&contact.why),
        escape_html(&contact.search_tip),
        escape_html(&contact.message_template),
    )
}

fn render_job(position: usize, result: &TailoredResult) -> String {
    let job = &result.ranked.listing;

    let contacts: String = result.contacts.iter().map(render_contact).collect();
    let cv = escape_html(&result.tailored_cv).replace('\n', "<br>");
    let posted = job
        .posted_at
        .map(|dt| format!(" &nbsp;|&nbsp; 🗓 Posted {}", dt.format("%b %d")))
        .unwrap_or_default();

    format!(
        r#"
    <div style="border:1px solid #ddd;border-radius:8px;padding:20px;margin:20px 0;font-family:Arial,sans-serif;">
      <div style="display:flex;justify-content:space-between;align-items:center;">
        <h2 style="color:{ACCENT};margin:0">#{position} {title}</h2>
        <span style="background:{ACCENT};color:#fff;border-radius:20px;padding:4px 12px;font-size:12px;">Match: {score}/100</span>
      </div>
      <p style="margin:4px 0;color:#555;font-size:14px;">🏢 {company} &nbsp;|&nbsp; 📍 {location}{posted}</p>
      <p style="color:#333;font-size:13px;margin:6px 0">{reason}</p>
      <a href="{url}" style="display:inline-block;background:{ACCENT};color:#fff;padding:8px 18px;border-radius:5px;text-decoration:none;font-size:14px;margin:8px 0;">Apply →</a>
      <details style="margin-top:16px;">
        <summary style="cursor:pointer;font-weight:bold;color:#333;">📄 Tailored CV for this role</summary>
        <div style="background:#f9f9f9;padding:14px;border-radius:6px;margin-top:8px;font-size:13px;line-height:1.6;">{cv}</div>
      </details>
      <div style="margin-top:16px;">
        <strong>👥 Who to contact on LinkedIn</strong>{contacts}
      </div>
    </div>"#,
        title = escape_html(&job.title),
        score = result.ranked.score,
        company = escape_html(&job.company),
        location = escape_html(&job.location),
        reason = escape_html(&result.ranked.reason),
        url = escape_html(&job.url),
    )
}

/// Builds the digest document. Output depends only on the arguments.
pub fn render_digest(results: &[TailoredResult], date: NaiveDate) -> String {
    let sections: String = results
        .iter()
        .enumerate()
        .map(|(i, result)| render_job(i + 1, result))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family:Arial,sans-serif;max-width:800px;margin:auto;padding:20px;color:#222;">
  <h1 style="color:{ACCENT}">🔍 Daily Job Digest - {today}</h1>
  <p>Here are the <strong>top {count} jobs</strong> posted in the last few days, tailored for you.
  Open any "Tailored CV" to expand it.</p>
  {sections}
  <hr style="margin-top:40px">
  <p style="color:#999;font-size:12px;text-align:center">Sent by your job digest agent &nbsp;|&nbsp; Good luck today!</p>
</body>
</html>
"#,
        today = date.format("%A, %B %d %Y"),
        count = results.len(),
    )
}
