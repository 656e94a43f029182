//! HTML for the pairing page

use crate::pairing::PairingView;
use std::time::Duration;

const STYLE: &str = "body { display: flex; flex-direction: column; align-items: center; \
justify-content: center; min-height: 100vh; margin: 0; background-color: #f0f2f5; \
font-family: Arial, sans-serif; } \
.code svg { width: 300px; height: 300px; margin: 20px; } \
.status { margin: 20px; padding: 10px; border-radius: 5px; background-color: #fff; \
box-shadow: 0 2px 5px rgba(0,0,0,0.1); }";

pub fn render(view: &PairingView) -> String {
    match view {
        PairingView::AlreadyConnected => page("Session connected", None, ""),
        PairingView::Awaiting { poll_interval } => page(
            "Pairing code not available yet. Waiting...",
            Some(*poll_interval),
            "",
        ),
        PairingView::Code {
            svg,
            reload_interval,
        } => page(
            "Scan the code with the messaging app",
            Some(*reload_interval),
            &format!("<div class=\"code\">{}</div>", strip_xml_prolog(svg)),
        ),
    }
}

fn page(status: &str, refresh: Option<Duration>, body: &str) -> String {
    let refresh = refresh
        .map(|d| format!("<meta http-equiv=\"refresh\" content=\"{}\">", d.as_secs().max(1)))
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<title>Pairing</title>\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
{refresh}\n<style>{STYLE}</style>\n</head>\n<body>\n\
<div class=\"status\">{status}</div>\n{body}\n</body>\n</html>\n"
    )
}

/// Inline SVG must not carry an XML declaration
fn strip_xml_prolog(svg: &str) -> &str {
    let trimmed = svg.trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some((_, rest)) = trimmed.split_once("?>") {
            return rest.trim_start();
        }
    }
    trimmed
}
