// src/report/html.rs
//! Single-file HTML report. The document is embedded as JSON together with
//! the view logic, so the page works offline. The initial view is rendered
//! server-side as well.

use anyhow::{Context, Result};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write as _;
use std::path::Path;

use crate::analyze::{FeatureLabel, FeatureSet, ScoredRecord};
use crate::report::ReportDocument;
use crate::view::{visible, FilterId, FilterState};

/// Badge labels for a record, in display order.
pub fn badges(f: &FeatureSet) -> Vec<&'static str> {
    let mut out = Vec::new();
    if f.sota {
        out.push("SOTA");
    }
    if f.has(FeatureLabel::Docker) {
        out.push("Docker");
    }
    if f.has(FeatureLabel::Pip) || f.has(FeatureLabel::Conda) {
        out.push("Py/Conda");
    }
    if f.has(FeatureLabel::Gpu) {
        out.push("GPU");
    }
    if f.has(FeatureLabel::Multivariate) {
        out.push("Multivariate");
    }
    if f.has(FeatureLabel::Exogenous) {
        out.push("Exogenous");
    }
    for (label, text) in [
        (FeatureLabel::DeepLearning, "Deep Learning"),
        (FeatureLabel::Statistical, "Statistical"),
        (FeatureLabel::Supervised, "Supervised"),
        (FeatureLabel::Unsupervised, "Unsupervised"),
        (FeatureLabel::Reinforcement, "RL"),
    ] {
        if f.has(label) {
            out.push(text);
        }
    }
    out
}

/// JSON safe to place inside a `<script>` element.
fn script_json(doc: &ReportDocument) -> Result<String> {
    let json = serde_json::to_string(doc).context("serialize report document")?;
    Ok(json
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}

/// `url` when it is a plain http(s) link, so `javascript:` and `data:` urls
/// never become clickable.
pub fn linkable_url(url: &str) -> Option<&str> {
    let url = url.trim();
    let scheme = url.split_once(':').map(|(s, _)| s)?;
    (scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")).then_some(url)
}

fn render_card(out: &mut String, r: &ScoredRecord) {
    let rec = &r.record;
    let title = encode_text(&rec.title);
    match linkable_url(&rec.url) {
        Some(url) => {
            let _ = write!(
                out,
                r#"<li class="card"><a href="{url}" target="_blank" rel="noopener">{title}</a>"#,
                url = encode_double_quoted_attribute(url),
            );
        }
        None => {
            let _ = write!(out, r#"<li class="card"><span class="title">{title}</span>"#);
        }
    }
    let _ = write!(out, r#" <span class="src">{}</span>"#, rec.source);
    for b in badges(&r.features) {
        let _ = write!(out, r#" <span class="badge">{b}</span>"#);
    }
    let _ = write!(
        out,
        r#"<div class="meta">score {score:.2} · popularity {metric} · {date}"#,
        score = r.trend_score,
        metric = rec.metric_primary,
        date = rec.created_at.format("%Y-%m-%d"),
    );
    if let Some(author) = &rec.author {
        let _ = write!(out, " · {}", encode_text(author));
    }
    out.push_str("</div>");
    if !rec.text.is_empty() {
        let snippet: String = rec.text.chars().take(280).collect();
        let _ = write!(out, r#"<p>{}</p>"#, encode_text(&snippet));
    }
    out.push_str("</li>\n");
}

/// Render the complete page.
pub fn render_html(doc: &ReportDocument) -> Result<String> {
    let data = script_json(doc)?;
    let state = FilterState::initial(doc);
    let mut out = String::with_capacity(16 * 1024 + data.len());

    out.push_str(HEAD);
    let _ = writeln!(
        out,
        r#"<header><h1>Time-Series Trend Report</h1><p>Generated {}</p></header>"#,
        doc.generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    out.push_str(r#"<nav id="categories">"#);
    for name in doc.category_names() {
        let active = state.active_category.as_deref() == Some(name);
        let count = doc.category(name).map_or(0, |r| r.len());
        let _ = write!(
            out,
            r#"<button data-category="{attr}"{cls}>{text} ({count})</button>"#,
            attr = encode_double_quoted_attribute(name),
            cls = if active { r#" class="active""# } else { "" },
            text = encode_text(name),
        );
    }
    out.push_str("</nav>\n");

    out.push_str(r#"<section id="controls"><span>Filters:</span>"#);
    for f in FilterId::all() {
        let _ = write!(
            out,
            r#"<label><input type="checkbox" data-filter="{id}"> {id}</label>"#,
            id = f.as_str()
        );
    }
    out.push_str(
        r#"<select id="sort"><option value="score">Trend score</option><option value="stars">Popularity</option><option value="date">Newest</option></select></section>"#,
    );
    out.push('\n');

    out.push_str(r#"<ol id="records">"#);
    out.push('\n');
    for r in visible(doc, &state) {
        render_card(&mut out, r);
    }
    out.push_str("</ol>\n");

    out.push_str(r#"<footer><h2>Sources</h2><table><tr><th>source</th><th>ok</th><th>failed</th><th>fetched</th><th>normalized</th><th>skipped</th></tr>"#);
    for (source, c) in &doc.per_source_counts {
        let _ = write!(
            out,
            "<tr><td>{source}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            c.queries_ok, c.queries_failed, c.fetched, c.normalized, c.skipped
        );
    }
    out.push_str("</table>");
    if !doc.errors.is_empty() {
        let _ = write!(out, "<h2>Errors ({})</h2><ul>", doc.errors.len());
        for e in &doc.errors {
            let _ = write!(
                out,
                "<li>{} [{}] {}: {}</li>",
                e.source,
                encode_text(e.category.as_deref().unwrap_or("-")),
                e.kind,
                encode_text(&e.reason)
            );
        }
        out.push_str("</ul>");
    }
    out.push_str("</footer>\n");

    let _ = writeln!(
        out,
        r#"<script type="application/json" id="report-data">{data}</script>"#
    );
    out.push_str(SCRIPT);
    out.push_str("</body></html>\n");
    Ok(out)
}

/// Render and write the page, creating parent directories.
pub fn write_report(path: &Path, doc: &ReportDocument) -> Result<()> {
    let html = render_html(doc)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create report dir {}", parent.display()))?;
    }
    std::fs::write(path, html).with_context(|| format!("write report {}", path.display()))?;
    tracing::info!(path = %path.display(), records = doc.total_records(), "report written");
    Ok(())
}

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en"><head><meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Time-Series Trend Report</title>
<style>
body{font-family:system-ui,sans-serif;margin:0 auto;max-width:960px;padding:1rem;color:#222}
nav button{margin:.2rem;padding:.3rem .6rem;border:1px solid #888;background:#fff;border-radius:4px;cursor:pointer}
nav button.active{background:#234;color:#fff}
#controls{margin:.8rem 0;display:flex;flex-wrap:wrap;gap:.6rem;align-items:center}
.card{margin:.6rem 0;padding:.6rem;border:1px solid #ddd;border-radius:6px}
.badge{font-size:.75rem;background:#eef;border-radius:3px;padding:0 .3rem;margin-left:.2rem}
.src{font-size:.75rem;color:#666}
.meta{font-size:.8rem;color:#555}
.title{font-weight:600}
table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:.2rem .5rem}
</style></head><body>
"#;

// Mirrors `view::reduce` / `view::visible`.
const SCRIPT: &str = r#"<script>
(function () {
  var doc = JSON.parse(document.getElementById('report-data').textContent);
  var state = {
    category: doc.per_category.length ? doc.per_category[0].name : null,
    filters: new Set(),
    sort: 'score'
  };
  function has(r, f) {
    if (f === 'sota') return !!r.features.sota;
    if (f.indexOf('source:') === 0) return r.source === f.slice(7);
    var fs = r.features;
    return [].concat(fs.learning_paradigm || [], fs.environment || [],
      fs.data_characteristics || [], fs.hardware || []).indexOf(f) >= 0;
  }
  function byId(a, b) { return a.id < b.id ? -1 : (a.id > b.id ? 1 : 0); }
  var cmp = {
    score: function (a, b) { return (b.trend_score - a.trend_score) || byId(a, b); },
    stars: function (a, b) { return (b.metric_primary - a.metric_primary) || byId(a, b); },
    date: function (a, b) {
      var d = Date.parse(b.created_at) - Date.parse(a.created_at);
      return d || byId(a, b);
    }
  };
  function visible() {
    var bucket = doc.per_category.filter(function (c) { return c.name === state.category; })[0];
    if (!bucket) return [];
    var active = Array.from(state.filters);
    return bucket.records
      .filter(function (r) { return active.every(function (f) { return has(r, f); }); })
      .slice().sort(cmp[state.sort]);
  }
  function badges(fs) {
    var has2 = function (k, v) { return (fs[k] || []).indexOf(v) >= 0; };
    var out = [];
    if (fs.sota) out.push('SOTA');
    if (has2('environment', 'docker')) out.push('Docker');
    if (has2('environment', 'pip') || has2('environment', 'conda')) out.push('Py/Conda');
    if (has2('hardware', 'gpu')) out.push('GPU');
    if (has2('data_characteristics', 'multivariate')) out.push('Multivariate');
    if (has2('data_characteristics', 'exogenous')) out.push('Exogenous');
    [['deep_learning', 'Deep Learning'], ['statistical', 'Statistical'], ['supervised', 'Supervised'],
     ['unsupervised', 'Unsupervised'], ['reinforcement', 'RL']].forEach(function (p) {
      if (has2('learning_paradigm', p[0])) out.push(p[1]);
    });
    return out;
  }
  function el(tag, cls, text) {
    var e = document.createElement(tag);
    if (cls) e.className = cls;
    if (text !== undefined) e.textContent = text;
    return e;
  }
  function render() {
    var list = document.getElementById('records');
    list.textContent = '';
    visible().forEach(function (r) {
      var li = el('li', 'card');
      if (/^https?:/i.test(r.url.trim())) {
        var a = el('a', null, r.title);
        a.href = r.url.trim(); a.target = '_blank'; a.rel = 'noopener';
        li.appendChild(a);
      } else {
        li.appendChild(el('span', 'title', r.title));
      }
      li.appendChild(document.createTextNode(' '));
      li.appendChild(el('span', 'src', r.source));
      badges(r.features).forEach(function (b) { li.appendChild(el('span', 'badge', b)); });
      var meta = 'score ' + r.trend_score.toFixed(2) + ' · popularity ' + r.metric_primary +
        ' · ' + r.created_at.slice(0, 10) + (r.author ? ' · ' + r.author : '');
      li.appendChild(el('div', 'meta', meta));
      if (r.text) li.appendChild(el('p', null, r.text.slice(0, 280)));
      list.appendChild(li);
    });
    document.querySelectorAll('nav button').forEach(function (b) {
      b.classList.toggle('active', b.dataset.category === state.category);
    });
  }
  document.querySelectorAll('nav button').forEach(function (b) {
    b.addEventListener('click', function () { state.category = b.dataset.category; render(); });
  });
  document.querySelectorAll('input[data-filter]').forEach(function (c) {
    c.addEventListener('change', function () {
      var f = c.dataset.filter;
      if (state.filters.has(f)) state.filters.delete(f); else state.filters.add(f);
      render();
    });
  });
  document.getElementById('sort').addEventListener('change', function (e) {
    state.sort = e.target.value; render();
  });
  render();
})();
</script>
"#;
