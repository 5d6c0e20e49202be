//! `{{variable}}` substitution and HTML helpers.

use serde_json::Value;

use notifyhub_entity::notification::{Notification, NotificationData};

const PRODUCT_NAME: &str = "NotifyHub";

/// Replace every `{{key}}` in `template` with the matching value from `data`.
///
/// Strings are inserted as-is; other JSON values use their JSON text and
/// `null` becomes empty. Unknown placeholders are left untouched.
pub fn render_string(template: &str, data: &NotificationData) -> String {
    let mut result = template.to_string();
    for (key, value) in data {
        let placeholder = format!("{{{{{key}}}}}");
        if !result.contains(&placeholder) {
            continue;
        }
        let replacement = match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        result = result.replace(&placeholder, &replacement);
    }
    result
}

/// Declared variables that `data` does not provide.
pub fn missing_variables<'a>(variables: &'a [String], data: &NotificationData) -> Vec<&'a str> {
    variables
        .iter()
        .filter(|name| data.get(name.as_str()).is_none_or(Value::is_null))
        .map(String::as_str)
        .collect()
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Default HTML email for a notification with an already rendered title and body.
///
/// All user-controlled text is escaped.
pub fn email_html(notification: &Notification, title: &str, body: &str) -> String {
    let details = if notification.data.is_empty() {
        String::new()
    } else {
        let pretty = serde_json::to_string_pretty(&notification.data).unwrap_or_default();
        format!("<pre class=\"details\">{}</pre>", escape_html(&pretty))
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
.container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
.header {{ background: #2563eb; color: #fff; padding: 16px; text-align: center; }}
.content {{ padding: 20px; background: #f9fafb; }}
.priority-high {{ border-left: 4px solid #f59e0b; }}
.priority-critical {{ border-left: 4px solid #dc2626; }}
.details {{ background: #fff; padding: 10px; border-radius: 4px; }}
.footer {{ padding: 16px; text-align: center; color: #6b7280; font-size: 12px; }}
</style>
</head>
<body>
<div class="container">
<div class="header"><h1>{product} Notification</h1></div>
<div class="content priority-{priority}">
<h2>{title}</h2>
<p>{body}</p>
{details}
<p><small>Priority: {priority} | Type: {kind}</small></p>
</div>
<div class="footer"><p>This is an automated message from {product}.</p></div>
</div>
</body>
</html>"#,
        title = escape_html(title),
        body = escape_html(body),
        details = details,
        priority = notification.priority.as_str(),
        kind = notification.notification_type.as_str(),
        product = PRODUCT_NAME,
    )
}
