// src/handlers/pages.rs

//! Páginas HTML simples. Todas menos `/analytics` exigem a sessão pronta;
//! sem ela o usuário cai no `/login`, que mostra o QR Code.

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::{config::AppState, models::whatsapp::ConnectionStatus, whatsapp::qr};

const NAV: [(&str, &str); 5] = [
    ("/", "Leads"),
    ("/products", "Produtos"),
    ("/campaigns", "Campanhas"),
    ("/analytics", "Analytics"),
    ("/settings", "Configurações"),
];

// GET /
pub async fn index(State(app_state): State<AppState>) -> Response {
    gated(&app_state, "Leads", LEADS_BODY)
}

// GET /products
pub async fn products(State(app_state): State<AppState>) -> Response {
    gated(&app_state, "Produtos", PRODUCTS_BODY)
}

// GET /campaigns
pub async fn campaigns(State(app_state): State<AppState>) -> Response {
    gated(&app_state, "Campanhas", "<p>Nenhuma campanha cadastrada.</p>")
}

// GET /settings
pub async fn settings(State(app_state): State<AppState>) -> Response {
    gated(&app_state, "Configurações", SETTINGS_BODY)
}

// GET /analytics
pub async fn analytics() -> Html<String> {
    layout("Analytics", ANALYTICS_BODY)
}

// GET /login
pub async fn login(State(app_state): State<AppState>) -> Response {
    let status = app_state.supervisor.status();
    if status.ready {
        return Redirect::to("/").into_response();
    }
    layout("Conectar WhatsApp", &login_body(&status)).into_response()
}

fn gated(app_state: &AppState, title: &str, body: &str) -> Response {
    if !app_state.supervisor.is_ready() {
        return Redirect::to("/login").into_response();
    }
    layout(title, body).into_response()
}

fn login_body(status: &ConnectionStatus) -> String {
    let qr_block = match status.qr_code.as_deref().and_then(qr::render_svg) {
        Some(svg) => format!("<p>Escaneie o QR Code com o WhatsApp do celular:</p><div class=\"qr\">{}</div>", svg),
        None if status.connecting => "<p>Conectando ao WhatsApp...</p>".to_string(),
        None => "<p>Aguardando QR Code...</p>".to_string(),
    };
    let error_block = status
        .last_error
        .as_deref()
        .map(|e| format!("<p class=\"error\">Último erro: {}</p>", escape_html(e)))
        .unwrap_or_default();

    format!(
        "{}{}\
         <form method=\"post\" action=\"/api/whatsapp-recreate\" onsubmit=\"fetch(this.action,{{method:'POST'}});return false;\">\
         <button type=\"submit\">Recriar conexão</button></form>\
         <script>setTimeout(() => location.reload(), 5000);</script>",
        qr_block, error_block
    )
}

fn layout(title: &str, body: &str) -> Html<String> {
    let nav: String = NAV
        .iter()
        .map(|(href, label)| format!("<a href=\"{}\">{}</a>", href, label))
        .collect::<Vec<_>>()
        .join(" | ");

    Html(format!(
        "<!DOCTYPE html>\
         <html lang=\"pt-BR\"><head><meta charset=\"utf-8\"><title>{title} - WhatsApp Leads</title>\
         <style>body{{font-family:sans-serif;margin:2rem}}table{{border-collapse:collapse}}\
         td,th{{border:1px solid #ccc;padding:4px 8px}}.error{{color:#b00}}</style></head>\
         <body><nav>{nav}</nav><h1>{title}</h1>{body}</body></html>",
        title = escape_html(title),
        nav = nav,
        body = body,
    ))
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
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

const LEADS_BODY: &str = r#"<table id="leads"><thead><tr>
<th>Número</th><th>Nome</th><th>Interações</th><th>Produtos</th><th>Tags</th><th>Status</th><th>Formulário</th>
</tr></thead><tbody></tbody></table>
<script>
const esc = s => String(s).replace(/[&<>"']/g, c => ({'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;',"'":'&#39;'}[c]));
fetch('/api/leads').then(r => r.json()).then(leads => {
  const rows = Object.entries(leads).map(([n, l]) =>
    `<tr><td>${esc(n)}</td><td>${esc(l.name)}</td><td>${l.interactions}</td><td>${esc(l.products.join(', '))}</td>` +
    `<td>${esc(l.tags.join(', '))}</td><td>${esc(l.status)}</td><td>${esc(l.formStatus)}</td></tr>`);
  document.querySelector('#leads tbody').innerHTML = rows.join('');
});
</script>"#;

const PRODUCTS_BODY: &str = r#"<table id="products"><thead><tr>
<th>Produto</th><th>Menções</th><th>Última menção</th><th>Tendência</th>
</tr></thead><tbody></tbody></table>
<script>
const esc = s => String(s).replace(/[&<>"']/g, c => ({'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;',"'":'&#39;'}[c]));
fetch('/api/products/stats').then(r => r.json()).then(stats => {
  document.querySelector('#products tbody').innerHTML = stats.map(p =>
    `<tr><td>${esc(p.name)}</td><td>${p.stats.mentions}</td><td>${esc(p.stats.lastMention ?? '-')}</td><td>${p.stats.trend}%</td></tr>`
  ).join('');
});
</script>"#;

const ANALYTICS_BODY: &str = r#"<p>Total de leads: <strong id="total">-</strong> | Horário de pico (UTC): <strong id="peak">-</strong></p>
<h2>Leads por dia</h2><ul id="days"></ul>
<script>
fetch('/api/metrics').then(r => r.json()).then(m => {
  document.getElementById('total').textContent = m.totalLeads;
  document.getElementById('peak').textContent = m.peakHour + 'h';
  document.getElementById('days').innerHTML =
    Object.entries(m.leadsByDay).map(([d, n]) => `<li>${d}: ${n}</li>`).join('');
});
</script>"#;

const SETTINGS_BODY: &str = r#"<pre id="status"></pre>
<button onclick="fetch('/api/whatsapp-reconnect',{method:'POST'}).then(load)">Reconectar</button>
<button onclick="fetch('/api/whatsapp-recreate',{method:'POST'}).then(load)">Recriar cliente</button>
<script>
function load() {
  fetch('/api/whatsapp-status').then(r => r.json()).then(s => {
    document.getElementById('status').textContent = JSON.stringify(s, null, 2);
  });
}
load();
</script>"#;
