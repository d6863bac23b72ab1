//! HTML rendering of the session. Every function here is a pure function of
//! its arguments.

use crate::detection::{Detection, IndicatorColor};
use crate::session::{CaptureState, SessionSnapshot};
use std::fmt::Write;

/// Confidence as a percentage with two decimals, e.g. `87.00%`
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.2}%", confidence * 100.0)
}

/// Bounding box corners with two decimals
pub fn format_coordinates(detection: &Detection) -> String {
    format!(
        "({:.2}, {:.2}) - ({:.2}, {:.2})",
        detection.xmin, detection.ymin, detection.xmax, detection.ymax
    )
}

/// Escape text for use in element content and quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
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

pub fn render_detection(detection: &Detection) -> String {
    format!(
        "<div class=\"detection\">\
         <p>Object: {}</p>\
         <p>Confidence: {}</p>\
         <p>Coordinates: {}</p>\
         </div>",
        escape_html(&detection.name),
        format_confidence(detection.confidence),
        format_coordinates(detection)
    )
}

pub fn render_indicator(color: IndicatorColor) -> String {
    format!(
        "<div id=\"indicator\" data-color=\"{0}\" \
         style=\"width: 50px; height: 50px; border-radius: 50%; background-color: {0};\"></div>",
        color.as_str()
    )
}

/// Detection history plus indicator, refreshed in place by the page
pub fn render_results(snapshot: &SessionSnapshot) -> String {
    let mut html = String::from("<div id=\"detection-results\">");
    for detection in &snapshot.detections {
        html.push_str(&render_detection(detection));
    }
    html.push_str("</div>");
    html.push_str(&render_indicator(snapshot.indicator));

    let state = match snapshot.capture_state {
        CaptureState::Idle => "idle",
        CaptureState::Capturing => "capturing",
    };
    let _ = write!(
        html,
        "<p id=\"capture-state\" class=\"status\">{} &middot; {} uploads, {} failed</p>",
        state, snapshot.uploads_issued, snapshot.uploads_failed
    );

    html
}

/// Full page: surface stream, controls and results
pub fn render_page(snapshot: &SessionSnapshot, surface_size: (u32, u32)) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Catwatch</title>
    <style>
        body {{ font-family: sans-serif; background: #282c34; color: #fff; text-align: center; }}
        #webcam-container img {{ display: block; margin: 1em auto; background: #000; }}
        button {{ font-size: 1em; margin: 0 0.5em; }}
        .detection {{ border-bottom: 1px solid #555; }}
        .status {{ color: #aaa; font-size: 0.8em; }}
        #indicator {{ margin: 1em auto; }}
    </style>
</head>
<body>
    <div id="webcam-container">
        <img src="/surface.mjpg" width="{width}" height="{height}" alt="Live surface">
        <button onclick="control('start')">Start</button>
        <button onclick="control('stop')">Stop</button>
    </div>
    <div id="results">{results}</div>
    <script>
        function control(action) {{
            fetch('/api/capture/' + action, {{ method: 'POST' }}).then(refresh);
        }}
        function refresh() {{
            fetch('/results')
                .then(r => r.text())
                .then(html => {{ document.getElementById('results').innerHTML = html; }})
                .catch(err => console.error('Error:', err));
        }}
        setInterval(refresh, 1000);
    </script>
</body>
</html>
"#,
        width = surface_size.0,
        height = surface_size.1,
        results = render_results(snapshot),
    )
}
