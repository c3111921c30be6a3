use crate::report::ReportData;

/// Render a self-contained HTML report (data embedded as JSON).
///
/// Important: we avoid `format!()` because the HTML contains many `{}` from JS
/// template literals (e.g., `${x}`), which would conflict with Rust formatting.
pub fn render_html_report(data: &ReportData) -> anyhow::Result<String> {
    // `</` inside the embedded JSON would end the script element early.
    let json = serde_json::to_string(data)?.replace("</", "<\\/");

    const TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>reqlint report</title>
<style>
  body { font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 0; }
  header { padding: 12px 16px; border-bottom: 1px solid #ddd; }
  .container { display: flex; height: calc(100vh - 58px); }
  .sidebar { width: 420px; border-right: 1px solid #ddd; padding: 12px; overflow: auto; }
  .main { flex: 1; padding: 12px; overflow: auto; }

  .summary { display: flex; gap: 16px; flex-wrap: wrap; font-size: 14px; color: #333; }
  .pill { padding: 4px 8px; border: 1px solid #ddd; border-radius: 999px; background: #fafafa; }

  .row { cursor: pointer; }
  .row:hover { background: #f3f3f3; }
  .row.selected { background: #e9f2ff; }
  .error { color: #b00020; }
  .warning { color: #a05a00; }
  .muted { color: #777; font-size: 12px; }

  table { border-collapse: collapse; width: 100%; margin-top: 8px; }
  th, td { border-bottom: 1px solid #eee; padding: 6px 8px; text-align: left; font-size: 14px; }
  th { position: sticky; top: 0; background: white; border-bottom: 1px solid #ddd; }
  .num { text-align: right; font-variant-numeric: tabular-nums; }
  code { font-family: ui-monospace, SFMono-Regular, Menlo, Consolas, monospace; font-size: 13px; }
</style>
</head>
<body>
<header>
  <div class="summary" id="summary"></div>
</header>

<div class="container">
  <div class="sidebar">
    <input id="search" placeholder="Search package..." style="width: 100%; box-sizing: border-box; padding: 6px 8px; border: 1px solid #ddd; border-radius: 6px;">
    <table>
      <thead>
        <tr>
          <th class="num">line</th>
          <th>package</th>
          <th>version</th>
        </tr>
      </thead>
      <tbody id="reqBody"></tbody>
    </table>
  </div>

  <div class="main">
    <h2 id="title">Findings</h2>
    <div id="meta" class="muted"></div>

    <table id="findingsTable">
      <thead>
        <tr>
          <th>severity</th>
          <th>code</th>
          <th>package</th>
          <th>lines</th>
          <th>message</th>
        </tr>
      </thead>
      <tbody id="findingsBody"></tbody>
    </table>
  </div>
</div>

<script>
// Embedded report data (JSON object literal)
const DATA = __DATA__;

const state = {
  selected: null,
  search: ""
};

function escapeHtml(s) {
  return String(s)
    .replaceAll("&", "&amp;")
    .replaceAll("<", "&lt;")
    .replaceAll(">", "&gt;")
    .replaceAll('"', "&quot;")
    .replaceAll("'", "&#39;");
}

function renderSummary() {
  const t = DATA.totals;
  const el = document.getElementById("summary");
  let audit = "";
  if (DATA.audit) {
    audit = `
      <span class="pill">files scanned: <b>${DATA.audit.files_scanned}</b></span>
      <span class="pill">imported distributions: <b>${Object.keys(DATA.audit.used).length}</b></span>
    `;
  }
  el.innerHTML = `
    <span class="pill"><code>${escapeHtml(DATA.manifest)}</code></span>
    <span class="pill">requirements: <b>${t.requirements}</b></span>
    <span class="pill">pinned: <b>${t.pinned}</b></span>
    <span class="pill error">errors: <b>${t.errors}</b></span>
    <span class="pill warning">warnings: <b>${t.warnings}</b></span>
  ` + audit;
}

function reqMatches(r) {
  if (!state.search) return true;
  const s = state.search.toLowerCase();
  return r.name.toLowerCase().includes(s) || r.normalized.includes(s);
}

function renderRequirements() {
  const body = document.getElementById("reqBody");
  body.innerHTML = "";
  for (const r of DATA.requirements) {
    if (!reqMatches(r)) continue;
    const tr = document.createElement("tr");
    tr.className = "row" + (state.selected === r.normalized ? " selected" : "");
    tr.onclick = () => selectPackage(r.normalized);
    const cls = r.status || "";
    const note = r.comment ? ` <span class="muted">${escapeHtml(r.comment)}</span>` : "";
    tr.innerHTML = `
      <td class="num">${r.line}</td>
      <td class="${cls}">${escapeHtml(r.name)}${note}</td>
      <td><code>${escapeHtml(r.version || "-")}</code></td>
    `;
    body.appendChild(tr);
  }
}

function renderFindings() {
  const body = document.getElementById("findingsBody");
  body.innerHTML = "";
  const shown = DATA.findings.filter(f => !state.selected || f.package === state.selected);
  document.getElementById("title").textContent =
    state.selected ? `Findings for ${state.selected}` : "Findings";
  document.getElementById("meta").textContent =
    shown.length ? `${shown.length} finding(s)` : "no findings";
  for (const f of shown) {
    const tr = document.createElement("tr");
    tr.innerHTML = `
      <td class="${f.severity}">${f.severity}</td>
      <td><code>${f.code}</code></td>
      <td>${escapeHtml(f.package)}</td>
      <td>${f.lines.join(", ")}</td>
      <td>${escapeHtml(f.message)}</td>
    `;
    body.appendChild(tr);
  }
}

function selectPackage(name) {
  state.selected = state.selected === name ? null : name;
  renderRequirements();
  renderFindings();
}

document.getElementById("search").addEventListener("input", (e) => {
  state.search = e.target.value || "";
  renderRequirements();
});

renderSummary();
renderRequirements();
renderFindings();
</script>
</body>
</html>
"#;

    Ok(TEMPLATE.replace("__DATA__", &json))
}
