//! HTML bodies for transactional email. All placeholders are escaped.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub subject: String,
    pub html: String,
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="margin:0;padding:0;background-color:#f4f6f8;font-family:Arial,Helvetica,sans-serif;">
  <div style="max-width:600px;margin:24px auto;background-color:#ffffff;border-radius:8px;padding:32px;color:#1f2933;">
    <h2 style="margin-top:0;color:#0b5394;">{title}</h2>
    {body}
    <p style="margin-top:32px;font-size:12px;color:#7b8794;">This is an automated message. Please do not reply.</p>
  </div>
</body>
</html>"#,
        title = escape_html(title),
        body = body,
    )
}

fn button(href: &str, label: &str) -> String {
    format!(
        r#"<p style="text-align:center;margin:28px 0;"><a href="{href}" style="background-color:#0b5394;color:#ffffff;padding:12px 24px;border-radius:6px;text-decoration:none;font-weight:bold;">{label}</a></p>"#,
        href = escape_html(href),
        label = escape_html(label),
    )
}

pub fn registration(name: &str, set_password_link: &str) -> EmailMessage {
    let body = format!(
        r#"<p style="font-size:15px;">Hello {name},</p>
    <p style="font-size:15px;">Your account has been created. Set your password to sign in.</p>
    {button}
    <p style="font-size:13px;color:#52606d;">The link expires in 24 hours.</p>"#,
        name = escape_html(name),
        button = button(set_password_link, "Set password"),
    );
    EmailMessage {
        subject: "Welcome! Set up your password".to_string(),
        html: layout("Welcome", &body),
    }
}

pub fn password_reset(name: &str, reset_link: &str) -> EmailMessage {
    let body = format!(
        r#"<p style="font-size:15px;">Hello {name},</p>
    <p style="font-size:15px;">We received a request to reset your password.</p>
    {button}
    <p style="font-size:13px;color:#52606d;">The link expires in 24 hours and can be used once. If you did not ask for this, ignore this email.</p>"#,
        name = escape_html(name),
        button = button(reset_link, "Reset password"),
    );
    EmailMessage {
        subject: "Reset your password".to_string(),
        html: layout("Password reset", &body),
    }
}

fn appointment_details(date: NaiveDate, start_time: &str, end_time: &str) -> String {
    format!(
        r#"<table style="width:100%;border-collapse:collapse;font-size:15px;">
      <tr><td style="padding:8px;border-bottom:1px solid #e4e7eb;color:#52606d;">Date</td><td style="padding:8px;border-bottom:1px solid #e4e7eb;">{date}</td></tr>
      <tr><td style="padding:8px;border-bottom:1px solid #e4e7eb;color:#52606d;">Time</td><td style="padding:8px;border-bottom:1px solid #e4e7eb;">{start} - {end}</td></tr>
    </table>"#,
        date = date.format("%d/%m/%Y"),
        start = escape_html(start_time),
        end = escape_html(end_time),
    )
}

pub fn appointment_confirmation(name: &str, date: NaiveDate, start_time: &str, end_time: &str) -> EmailMessage {
    let body = format!(
        r#"<p style="font-size:15px;">Hello {name},</p>
    <p style="font-size:15px;">Your appointment has been booked.</p>
    {details}"#,
        name = escape_html(name),
        details = appointment_details(date, start_time, end_time),
    );
    EmailMessage {
        subject: "Appointment confirmed".to_string(),
        html: layout("Appointment confirmed", &body),
    }
}

pub fn appointment_cancellation(name: &str, date: NaiveDate, start_time: &str, end_time: &str) -> EmailMessage {
    let body = format!(
        r#"<p style="font-size:15px;">Hello {name},</p>
    <p style="font-size:15px;">Your appointment below has been cancelled. Please book a new time if you still need a consultation.</p>
    {details}"#,
        name = escape_html(name),
        details = appointment_details(date, start_time, end_time),
    );
    EmailMessage {
        subject: "Appointment cancelled".to_string(),
        html: layout("Appointment cancelled", &body),
    }
}

pub fn report_resolution(name: &str, category: &str, resolution: &str) -> EmailMessage {
    let body = format!(
        r#"<p style="font-size:15px;">Hello {name},</p>
    <p style="font-size:15px;">Your report in <strong>{category}</strong> has been resolved.</p>
    <div style="background-color:#f0f4f8;border-left:4px solid #0b5394;padding:12px 16px;font-size:15px;white-space:pre-wrap;">{resolution}</div>"#,
        name = escape_html(name),
        category = escape_html(category),
        resolution = escape_html(resolution),
    );
    EmailMessage {
        subject: format!("Your report has been resolved: {}", category),
        html: layout("Report resolved", &body),
    }
}
