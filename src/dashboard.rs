use chrono::{Datelike, NaiveDate};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::advantage::{
    days_remaining, leader_and_ahead, transform, y_bound, Advantage, AdvantagePoint,
};
use crate::config::WagerConfig;
use crate::error::Result;
use crate::history::History;
use crate::output::{
    escape_html, leader_color, leader_label, money_str, pct_str, save_text, COLOR_A, COLOR_B,
};

const RECENT_ROWS: usize = 10;

/// Chart.js scriptable radius: a dot only where a value has no present
/// neighbour in its dataset, matching the isolated-run dots of the PNG.
pub const POINT_RADIUS_JS: &str = "c=>{const d=c.dataset.data,i=c.dataIndex,p=d[i],a=d[i-1],b=d[i+1];\
return p&&p.y!==null&&!(a&&a.y!==null)&&!(b&&b.y!==null)?4:0;}";

const PAGE_STYLE: &str = "*{margin:0;padding:0;box-sizing:border-box}\
body{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;background:#f5f5f5;color:#0b1221}\
.wrap{max-width:1000px;margin:0 auto;padding:24px 16px}\
h1{font-size:26px;margin-bottom:4px}\
.sub{color:#6b7280;margin-bottom:16px}\
.kpis{display:grid;grid-template-columns:repeat(3,1fr);gap:12px;margin-bottom:16px}\
.kpi{background:#fff;border-radius:12px;padding:14px 16px}\
.kpi .label{color:#6b7280;font-size:13px}\
.kpi .value{font-weight:700;font-size:22px}\
.card{background:#fff;border-radius:12px;padding:14px 16px;margin-bottom:16px}\
.chart{position:relative;height:360px}\
table{width:100%;border-collapse:collapse}\
th,td{text-align:left;padding:8px;border-bottom:1px solid #e5e7eb}\
.pill{border:1px solid;border-radius:999px;padding:3px 8px;font-size:12px}\
.empty{text-align:center;color:#6b7280;padding:64px 0}\
.note{color:#6b7280;font-size:12px;margin-top:4px}";

// ═══════════════════════════════════════════════════════════════════════
// HTML helpers
// ═══════════════════════════════════════════════════════════════════════

fn js_points(series: &[AdvantagePoint], values: &[Option<f64>]) -> String {
    let items: Vec<String> = series
        .iter()
        .zip(values)
        .map(|(p, v)| match v {
            Some(y) => format!("{{x:{:.4},y:{:.4}}}", p.x, y),
            None => format!("{{x:{:.4},y:null}}", p.x),
        })
        .collect();
    format!("[{}]", items.join(","))
}

/// Quoted JS string literal, safe inside a `<script>` block.
fn js_str(s: &str) -> String {
    serde_json::to_string(s)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

fn recent_rows_html(history: &History, wager: &WagerConfig) -> String {
    history
        .tail(RECENT_ROWS)
        .iter()
        .rev()
        .map(|s| {
            let (leader, ahead) = leader_and_ahead(s);
            let color = leader_color(leader);
            format!(
                "<tr><td>{date}</td><td>{a}</td><td>{b}</td><td>{name}</td>\
<td><span class=\"pill\" style=\"border-color:{color};color:{color}\">{pct}</span></td></tr>",
                date = s.date,
                a = money_str(s.value_a),
                b = money_str(s.value_b),
                name = escape_html(&leader_label(leader, wager)),
                color = color,
                pct = pct_str(ahead),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ═══════════════════════════════════════════════════════════════════════
// Page generation
// ═══════════════════════════════════════════════════════════════════════

fn empty_page(wager: &WagerConfig, days_left: i64) -> String {
    let title = escape_html(&wager.title());
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
<div class="wrap">
<h1>{title}</h1>
<div class="sub">{ta} vs {tb} market capitalization &bull; Ends {end}</div>
<div class="kpis">
<div class="kpi"><div class="label">Days left</div><div class="value">{days_left}</div></div>
<div class="kpi"><div class="label">Currently winning</div><div class="value">&mdash;</div></div>
<div class="kpi"><div class="label">% ahead</div><div class="value">&mdash;</div></div>
</div>
<div class="card empty">No data yet. The first snapshot will appear after the next daily update.</div>
</div>
</body>
</html>
"#,
        title = title,
        style = PAGE_STYLE,
        ta = escape_html(&wager.party_a.ticker),
        tb = escape_html(&wager.party_b.ticker),
        end = wager.resolution_date.format("%B %-d, %Y"),
        days_left = days_left,
    )
}

/// Full dashboard page. An empty history yields the placeholder page.
pub fn generate_dashboard(history: &History, wager: &WagerConfig, today: NaiveDate) -> String {
    let advantage = transform(history, wager.resolution_date, today);
    let (Some(standing), Some(origin)) = (advantage.standing.as_ref(), history.first()) else {
        let days_left = days_remaining(wager.resolution_date, today);
        return empty_page(wager, days_left);
    };

    let Advantage { series, .. } = &advantage;
    let parts = advantage.split();
    let bound = y_bound(series);
    let title = escape_html(&wager.title());
    let winner = escape_html(&leader_label(standing.leader, wager));

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<script src="https://cdn.jsdelivr.net/npm/chart.js@4"></script>
<style>{style}</style>
</head>
<body>
<div class="wrap">
<h1>{title}</h1>
<div class="sub">{ta} vs {tb} market capitalization &bull; Ends {end}</div>
<div class="kpis">
<div class="kpi"><div class="label">Days left</div><div class="value">{days_left}</div></div>
<div class="kpi"><div class="label">Currently winning</div><div class="value" style="color:{winner_color}">{winner}</div></div>
<div class="kpi"><div class="label">% ahead</div><div class="value">{ahead}</div></div>
</div>
<div class="card">
<div class="chart"><canvas id="advantage"></canvas></div>
<div class="note">Above zero: {name_a} leads. Below zero: {name_b} leads. % = (A &minus; B) / B. Updated {as_of}.</div>
</div>
<div class="card">
<table>
<thead><tr><th>Date</th><th>{ta} Market Cap</th><th>{tb} Market Cap</th><th>Leader</th><th>% Ahead</th></tr></thead>
<tbody>
{rows}
</tbody>
</table>
<div class="note">% ahead = (leader &minus; loser) / loser</div>
</div>
</div>
<script>
const ORIGIN=Date.UTC({oy},{om},{od});
const DAY=86400000;
const POS={pos};
const NEG={neg};
const fmtDay=x=>new Date(ORIGIN+Math.round(x)*DAY).toISOString().slice(0,10);
const mkDs=(l,c,d)=>({{label:l,data:d,borderColor:c,backgroundColor:c+'26',borderWidth:2,pointRadius:{point_radius},fill:'origin',spanGaps:false,tension:0}});
const zeroLine={{id:'zeroLine',afterDatasetsDraw(ch){{const y=ch.scales.y.getPixelForValue(0);const a=ch.chartArea;const c=ch.ctx;c.save();c.strokeStyle='#cbd5e1';c.lineWidth=2;c.setLineDash([4,3]);c.beginPath();c.moveTo(a.left,y);c.lineTo(a.right,y);c.stroke();c.restore();}}}};
new Chart(document.getElementById('advantage'),{{type:'line',data:{{datasets:[mkDs({label_a},'{color_a}',POS),mkDs({label_b},'{color_b}',NEG)]}},options:{{responsive:true,maintainAspectRatio:false,parsing:true,interaction:{{mode:'nearest',intersect:false}},plugins:{{legend:{{position:'bottom'}},tooltip:{{filter:i=>i.raw.y!==null,callbacks:{{title:i=>fmtDay(i[0].raw.x),label:i=>i.dataset.label+': '+i.raw.y.toFixed(2)+'%'}}}}}},scales:{{x:{{type:'linear',ticks:{{maxTicksLimit:8,callback:fmtDay}},grid:{{display:false}}}},y:{{min:-{bound},max:{bound},title:{{display:true,text:'% ahead'}},grid:{{color:'#e5e7eb'}}}}}}}},plugins:[zeroLine]}});
</script>
</body>
</html>
"#,
        title = title,
        style = PAGE_STYLE,
        point_radius = POINT_RADIUS_JS,
        ta = escape_html(&wager.party_a.ticker),
        tb = escape_html(&wager.party_b.ticker),
        end = wager.resolution_date.format("%B %-d, %Y"),
        days_left = standing.days_remaining,
        winner_color = leader_color(standing.leader),
        winner = winner,
        ahead = pct_str(standing.percent_ahead),
        name_a = escape_html(&wager.label_a()),
        name_b = escape_html(&wager.label_b()),
        as_of = standing.as_of,
        rows = recent_rows_html(history, wager),
        oy = origin.date.year(),
        om = origin.date.month0(),
        od = origin.date.day(),
        pos = js_points(series, &parts.positive),
        neg = js_points(series, &parts.negative),
        label_a = js_str(&wager.label_a()),
        label_b = js_str(&wager.label_b()),
        color_a = COLOR_A,
        color_b = COLOR_B,
        bound = bound,
    )
}

/// Write `index.html` into `site_dir` and return its path.
pub fn render(
    history: &History,
    wager: &WagerConfig,
    today: NaiveDate,
    site_dir: &Path,
) -> Result<PathBuf> {
    let html = generate_dashboard(history, wager, today);
    let path = site_dir.join("index.html");
    save_text(&html, &path)?;
    info!(path = %path.display(), snapshots = history.len(), "dashboard written");
    Ok(path)
}
