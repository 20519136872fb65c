//! Admin panel routes and handlers
//!
//! Every form post runs one lifecycle operation and redirects back to the
//! roster with a short status message, whatever the outcome.

use axum::{
    extract::{Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Redirect,
    },
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, warn};

use crate::logging::SharedLogBuffer;
use crate::managers::{Outcome, SharedLifecycleManager};
use crate::state::{Snapshot, UserRecord};

#[derive(Clone)]
pub struct AdminState {
    pub manager: SharedLifecycleManager,
    pub log_buffer: SharedLogBuffer,
}

pub fn admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/update_status", post(update_status))
        .route("/delete_user", post(delete_user))
        .route("/send_link", post(send_link))
        .route("/renew_user", post(renew_user))
        .route("/logs", get(logs_page))
        .route("/logs/stream", get(logs_stream))
        .with_state(state)
}

#[derive(Deserialize)]
struct DashboardParams {
    msg: Option<String>,
}

#[derive(Deserialize)]
struct StatusForm {
    #[serde(default)]
    whatsapp: String,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
struct DeleteForm {
    #[serde(default)]
    whatsapp: String,
}

#[derive(Deserialize)]
struct LinkForm {
    #[serde(default)]
    link: String,
}

#[derive(Deserialize)]
struct RenewForm {
    #[serde(default)]
    whatsapp: String,
    #[serde(default)]
    renewal_days: String,
}

/// GET / - Roster table and action forms
async fn dashboard(
    Query(params): Query<DashboardParams>,
    State(state): State<AdminState>,
) -> impl IntoResponse {
    match state.manager.snapshot().await {
        Ok(snapshot) => Html(dashboard_page(&snapshot, params.msg.as_deref())),
        Err(e) => {
            error!("Failed to load roster for dashboard: {}", e);
            Html(dashboard_page(
                &Snapshot::new(),
                Some("error:Roster could not be loaded, see logs"),
            ))
        }
    }
}

/// POST /update_status
async fn update_status(
    State(state): State<AdminState>,
    Form(form): Form<StatusForm>,
) -> Redirect {
    let outcome = state.manager.set_status(&form.whatsapp, &form.status).await;
    log_outcome("set_status", &outcome);
    back_to_dashboard(&outcome_message(
        &outcome,
        &format!("Status of {} set to {}", form.whatsapp, form.status),
        &form.whatsapp,
    ))
}

/// POST /delete_user
async fn delete_user(State(state): State<AdminState>, Form(form): Form<DeleteForm>) -> Redirect {
    let outcome = state.manager.delete_user(&form.whatsapp).await;
    log_outcome("delete_user", &outcome);
    back_to_dashboard(&outcome_message(
        &outcome,
        &format!("Deleted {}", form.whatsapp),
        &form.whatsapp,
    ))
}

/// POST /send_link
async fn send_link(State(state): State<AdminState>, Form(form): Form<LinkForm>) -> Redirect {
    let outcome = state.manager.broadcast_link(&form.link).await;
    log_outcome("broadcast_link", &outcome);
    back_to_dashboard(&outcome_message(&outcome, "Link sent", ""))
}

/// POST /renew_user
async fn renew_user(State(state): State<AdminState>, Form(form): Form<RenewForm>) -> Redirect {
    let days = match parse_renewal_days(&form.renewal_days) {
        Some(days) => days,
        None => {
            warn!(
                "Rejected renewal for {}: '{}' is not a day count",
                form.whatsapp, form.renewal_days
            );
            return back_to_dashboard("error:Renewal days must be a whole number");
        }
    };

    let outcome = state.manager.renew(&form.whatsapp, days).await;
    log_outcome("renew", &outcome);
    back_to_dashboard(&outcome_message(
        &outcome,
        &format!("Renewed {} by {} days", form.whatsapp, days),
        &form.whatsapp,
    ))
}

/// GET /logs - Recent log lines as plain text
async fn logs_page(State(state): State<AdminState>) -> String {
    state
        .log_buffer
        .recent(500)
        .iter()
        .map(|entry| entry.format())
        .collect::<Vec<_>>()
        .join("\n")
}

/// GET /logs/stream - Server-sent events for new log lines
async fn logs_stream(
    State(state): State<AdminState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.log_buffer.subscribe())
        // Lagged receivers just miss lines
        .filter_map(|entry| entry.ok())
        .map(|entry| Ok(Event::default().data(entry.to_json())));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn log_outcome(operation: &str, outcome: &Outcome) {
    if outcome.is_partial() {
        warn!("{} only partly succeeded: {:?}", operation, outcome);
    } else if !outcome.is_applied() {
        debug!("{} made no change: {:?}", operation, outcome);
    }
}

fn back_to_dashboard(msg: &str) -> Redirect {
    Redirect::to(&format!("/?msg={}", urlencoding::encode(msg)))
}

fn parse_renewal_days(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

/// Flash message for an outcome; `error:` marks it as a failure
fn outcome_message(outcome: &Outcome, done: &str, whatsapp: &str) -> String {
    match outcome {
        Outcome::Applied {
            persisted: false, ..
        } => format!("error:{} but saving failed, see logs", done),
        Outcome::Applied { delivery, .. } if delivery.failed > 0 => format!(
            "{} ({} of {} notifications failed)",
            done,
            delivery.failed,
            delivery.attempted()
        ),
        Outcome::Applied { .. } => done.to_string(),
        Outcome::NotFound => format!("error:No user with WhatsApp {}", whatsapp),
        Outcome::NotEligible => format!("error:User {} is not verified", whatsapp),
        Outcome::Ignored => "error:Nothing to do".to_string(),
        Outcome::StoreUnavailable => "error:Roster could not be loaded, see logs".to_string(),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn user_row(user: &UserRecord) -> String {
    let whatsapp = escape_html(&user.whatsapp);
    let timestamp = |t: Option<chrono::NaiveDateTime>| {
        t.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string())
    };

    format!(
        r#"<tr>
    <td>{whatsapp}</td>
    <td>{name}</td>
    <td class="status {status}">{status}</td>
    <td>{days}</td>
    <td>{verified}</td>
    <td>{renewed}</td>
    <td>{chat}</td>
    <td>
        <form method="post" action="/update_status">
            <input type="hidden" name="whatsapp" value="{whatsapp}">
            <button name="status" value="verified">Verify</button>
            <button name="status" value="rejected">Reject</button>
        </form>
        <form method="post" action="/renew_user">
            <input type="hidden" name="whatsapp" value="{whatsapp}">
            <input type="number" name="renewal_days" min="0" value="30">
            <button>Renew</button>
        </form>
        <form method="post" action="/delete_user" onsubmit="return confirm('Delete this user?')">
            <input type="hidden" name="whatsapp" value="{whatsapp}">
            <button class="danger">Delete</button>
        </form>
    </td>
</tr>"#,
        whatsapp = whatsapp,
        name = escape_html(&user.name),
        status = escape_html(user.status.as_str()),
        days = user.remaining_days,
        verified = timestamp(user.last_verified),
        renewed = timestamp(user.last_renewed),
        chat = if user.chat_id.is_some() { "yes" } else { "no" },
    )
}

fn dashboard_page(snapshot: &Snapshot, msg: Option<&str>) -> String {
    let banner = match msg {
        Some(m) => match m.strip_prefix("error:") {
            Some(err) => format!(r#"<div class="msg error">{}</div>"#, escape_html(err)),
            None => format!(r#"<div class="msg">{}</div>"#, escape_html(m)),
        },
        None => String::new(),
    };
    let rows: String = snapshot.users.iter().map(user_row).collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Admin Panel</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 2rem; }}
        table {{ width: 100%; border-collapse: collapse; }}
        th, td {{ padding: 0.5rem; border-bottom: 1px solid #ddd; text-align: left; vertical-align: top; }}
        td form {{ display: inline-block; margin-right: 0.5rem; }}
        td input[type=number] {{ width: 5rem; }}
        .status.verified {{ color: #2e7d32; }}
        .status.rejected {{ color: #c62828; }}
        .msg {{ padding: 0.75rem; margin-bottom: 1rem; background: #e8f5e9; }}
        .msg.error {{ background: #ffebee; }}
        .danger {{ color: #c62828; }}
    </style>
</head>
<body>
    <h1>Users ({count})</h1>
    {banner}
    <form method="post" action="/send_link">
        <input type="url" name="link" placeholder="Link for verified users" value="{link}" size="60">
        <button>Send to verified users</button>
    </form>
    <table>
        <thead>
            <tr><th>WhatsApp</th><th>Name</th><th>Status</th><th>Days</th><th>Verified</th><th>Renewed</th><th>Chat</th><th>Actions</th></tr>
        </thead>
        <tbody>
{rows}
        </tbody>
    </table>
    <p><a href="/logs">Logs</a></p>
</body>
</html>"#,
        count = snapshot.users.len(),
        banner = banner,
        link = escape_html(&snapshot.link),
        rows = rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::DeliveryReport;
    use crate::state::UserStatus;

    #[test]
    fn test_parse_renewal_days() {
        assert_eq!(parse_renewal_days("30"), Some(30));
        assert_eq!(parse_renewal_days(" 7 "), Some(7));
        assert_eq!(parse_renewal_days("-3"), None);
        assert_eq!(parse_renewal_days("ten"), None);
        assert_eq!(parse_renewal_days(""), None);
    }

    #[test]
    fn test_outcome_messages() {
        let applied = Outcome::Applied {
            persisted: true,
            delivery: DeliveryReport::default(),
        };
        assert_eq!(outcome_message(&applied, "Deleted 555", "555"), "Deleted 555");

        let unsaved = Outcome::Applied {
            persisted: false,
            delivery: DeliveryReport::default(),
        };
        assert!(outcome_message(&unsaved, "Deleted 555", "555").starts_with("error:"));

        let partial = Outcome::Applied {
            persisted: true,
            delivery: DeliveryReport {
                sent: 2,
                failed: 1,
                skipped: 0,
            },
        };
        assert_eq!(
            outcome_message(&partial, "Link sent", ""),
            "Link sent (1 of 3 notifications failed)"
        );

        assert_eq!(
            outcome_message(&Outcome::NotFound, "x", "555"),
            "error:No user with WhatsApp 555"
        );
    }

    #[test]
    fn test_quote_in_whatsapp_stays_out_of_scripts() {
        let mut snapshot = Snapshot::new();
        snapshot
            .users
            .push(UserRecord::new("');alert(document.cookie);('", "Eve"));

        let html = dashboard_page(&snapshot, None);

        for line in html.lines().filter(|l| l.contains("onsubmit=")) {
            assert!(!line.contains("alert"), "script handler carries user data: {}", line);
            assert!(line.contains("confirm('Delete this user?')"));
        }
        assert!(html.contains(r#"value="&#39;);alert(document.cookie);(&#39;""#));
    }

    #[test]
    fn test_dashboard_escapes_user_input() {
        let mut snapshot = Snapshot::new();
        snapshot.link = "https://x.test/?a=1&b=2".to_string();
        snapshot.users.push(
            UserRecord::new("555", "<script>alert(1)</script>")
                .with_status(UserStatus::Verified)
                .with_chat_id("c1"),
        );

        let html = dashboard_page(&snapshot, Some("error:No user with WhatsApp 9"));

        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a=1&amp;b=2"));
        assert!(html.contains(r#"<div class="msg error">No user with WhatsApp 9</div>"#));
        assert!(html.contains("<h1>Users (1)</h1>"));
    }
}
