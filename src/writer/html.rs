//! Self-contained HTML page: inline SVG charts, the run log and a run button

use super::{escape, svg, Page, Writer};
use crate::chart::tooltip::POINTER_OFFSET;
use crate::diagnostics::Severity;
use crate::Result;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 24px; color: #222; }
#log { background: #f6f6f6; border: 1px solid #ddd; padding: 8px 12px; white-space: pre-wrap; font-family: monospace; }
#log .warning { color: #8a5a00; }
#log .error { color: #b2182b; font-weight: bold; }
.chart-box { margin: 16px 0; }
.tooltip { position: absolute; pointer-events: none; background: rgba(255,255,255,0.95); border: 1px solid #999; border-radius: 3px; padding: 4px 6px; font-size: 12px; white-space: pre-line; visibility: hidden; }
"#;

/// HTML page writer
#[derive(Debug, Clone, Default)]
pub struct HtmlWriter;

impl HtmlWriter {
    pub fn new() -> Self {
        Self
    }

    fn log(page: &Page) -> String {
        let mut out = String::from(r#"<div id="log">"#);
        for entry in page.log.entries() {
            let (class, prefix) = match entry.severity {
                Severity::Info => ("info", ""),
                Severity::Warning => ("warning", "Warning: "),
                Severity::Error => ("error", "Error: "),
            };
            out.push_str(&format!(
                r#"<div class="{}">{}{}</div>"#,
                class,
                prefix,
                escape(&entry.message)
            ));
        }
        out.push_str("</div>");
        out
    }

    fn run_button(endpoint: &str) -> String {
        format!(
            r#"<button id="run" type="button">Run analysis</button>
<script>
document.getElementById("run").addEventListener("click", async (event) => {{
  const button = event.currentTarget;
  button.disabled = true;
  try {{
    const response = await fetch("{}", {{ method: "POST" }});
    if (response.ok) {{ window.location.reload(); }}
    else {{
      const body = await response.json().catch(() => ({{}}));
      alert((body.error && body.error.message) || response.statusText);
    }}
  }} finally {{
    button.disabled = false;
  }}
}});
</script>"#,
            escape(endpoint)
        )
    }

    fn tooltip_script() -> String {
        format!(
            r#"<script>
document.querySelectorAll("svg.chart").forEach((chart) => {{
  const tip = document.createElement("div");
  tip.className = "tooltip";
  document.body.appendChild(tip);
  chart.querySelectorAll("[data-tooltip]").forEach((mark) => {{
    mark.addEventListener("mousemove", (e) => {{
      tip.textContent = mark.getAttribute("data-tooltip");
      tip.style.left = (e.pageX + {dx}) + "px";
      tip.style.top = (e.pageY + {dy}) + "px";
      tip.style.visibility = "visible";
    }});
    mark.addEventListener("mouseleave", () => {{ tip.style.visibility = "hidden"; }});
  }});
}});
</script>"#,
            dx = POINTER_OFFSET.0,
            dy = POINTER_OFFSET.1
        )
    }
}

impl Writer for HtmlWriter {
    fn write(&self, page: &Page) -> Result<String> {
        self.validate(page)?;

        let title = escape(page.title);
        let mut body = format!("<h1>{}</h1>\n", title);
        if let Some(endpoint) = page.run_endpoint {
            body.push_str(&Self::run_button(endpoint));
            body.push('\n');
        }
        body.push_str(&Self::log(page));
        body.push('\n');
        for area in page.areas {
            body.push_str(&format!(
                "<div class=\"chart-box\">{}</div>\n",
                svg::render(area)
            ));
        }
        body.push_str(&Self::tooltip_script());

        Ok(format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
            title, STYLE, body
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartArea;
    use crate::diagnostics::DiagnosticsLog;

    #[test]
    fn test_page_contains_log_and_charts() {
        let mut log = DiagnosticsLog::new();
        log.info("Analysis complete");
        log.error("Query step 'kpis' failed: <boom>");
        let mut area = ChartArea::new("vizDaily", 300.0, 200.0);
        area.show_placeholder("No data");
        let areas = vec![area];

        let html = HtmlWriter::new().write(&Page::new("Taxi & trips", &log, &areas)).unwrap();
        assert!(html.contains("<title>Taxi &amp; trips</title>"));
        assert!(html.contains(r#"<div class="error">Error: Query step &#39;kpis&#39; failed: &lt;boom&gt;</div>"#));
        assert!(html.contains(r#"<svg id="vizDaily""#));
        assert!(html.contains("e.pageX + 12"));
        assert!(!html.contains(r#"id="run""#));
    }

    #[test]
    fn test_run_button_only_with_endpoint() {
        let log = DiagnosticsLog::new();
        let page = Page::new("Exam", &log, &[]).with_run_endpoint("/api/v1/run");
        let html = HtmlWriter::new().write(&page).unwrap();
        assert!(html.contains(r#"fetch("/api/v1/run""#));
        assert!(html.contains("button.disabled = false"));
        // Error responses are `{"status": "error", "error": {"message", "type"}}`
        assert!(html.contains("body.error && body.error.message"));
        assert!(!html.contains("alert(body.error ||"));
    }
}
