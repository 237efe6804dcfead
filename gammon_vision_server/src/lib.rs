use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gammon_vision::core_modules::game_log::DEFAULT_LOCK_TIMEOUT;
use gammon_vision::{BoardDetector, DetectorConfig, GameLog, GameStateSnapshot, LogError, Point};
use serde::{Deserialize, Serialize};

const DETECT_BODY_LIMIT: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub log_path: PathBuf,
    pub lock_timeout: Duration,
    pub detector: DetectorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".to_string(),
            log_path: PathBuf::from("game_log.txt"),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            detector: DetectorConfig::default(),
        }
    }
}

/// Shared handler state: the log file and the detector session.
#[derive(Clone)]
pub struct AppState {
    pub log: GameLog,
    pub detector: Arc<Mutex<BoardDetector>>,
}

impl AppState {
    pub fn new(cfg: &ServerConfig) -> Self {
        Self {
            log: GameLog::new(cfg.log_path.clone(), cfg.lock_timeout),
            detector: Arc::new(Mutex::new(BoardDetector::new(cfg.detector.clone()))),
        }
    }
}

/// Body of `POST /api/log`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub game_state: GameStateSnapshot,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Logged {
    pub success: bool,
    pub logged: usize,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct RegionQuery {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// Handler failure, rendered as `{"success": false, "error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unavailable(String),
    Internal(String),
}

impl From<LogError> for ApiError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::Timestamp { .. } => ApiError::BadRequest(err.to_string()),
            LogError::LockTimeout { .. } => ApiError::Unavailable(err.to_string()),
            LogError::Io { .. } => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        } else {
            tracing::warn!(%status, error = %message, "rejected request");
        }
        (status, Json(serde_json::json!({ "success": false, "error": message }))).into_response()
    }
}

async fn log_game_state(State(state): State<AppState>, body: Bytes) -> Result<Json<Logged>, ApiError> {
    let submission: Submission =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("malformed submission: {e}")))?;
    let stamp = gammon_vision::format_stamp(&submission.timestamp)?;

    let log = state.log.clone();
    let block_stamp = stamp.clone();
    let logged = tokio::task::spawn_blocking(move || log.append_snapshot(&submission.game_state, &block_stamp))
        .await
        .map_err(|e| ApiError::Internal(format!("log writer task failed: {e}")))??;

    Ok(Json(Logged {
        success: true,
        logged,
        timestamp: stamp,
    }))
}

async fn detect_frame(State(state): State<AppState>, body: Bytes) -> Result<Json<GameStateSnapshot>, ApiError> {
    let detector = Arc::clone(&state.detector);
    let snapshot = tokio::task::spawn_blocking(move || {
        let frame = image::load_from_memory(&body)
            .map_err(|e| ApiError::BadRequest(format!("undecodable frame: {e}")))?
            .to_rgba8();
        let mut detector = detector
            .lock()
            .map_err(|_| ApiError::Internal("detector state poisoned".to_string()))?;
        Ok::<_, ApiError>(detector.detect(&frame))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("detector task failed: {e}")))??;
    Ok(Json(snapshot))
}

async fn regions(Query(query): Query<RegionQuery>) -> Result<Json<Vec<Point>>, ApiError> {
    match (query.width, query.height) {
        (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Ok(Json(gammon_vision::board_points(w, h))),
        _ => Err(ApiError::BadRequest("width and height must be positive".to_string())),
    }
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Gammon Vision</title></head>
<body style="font-family:sans-serif; background:#222; color:#ddd">
    <main>
        <h2>Gammon Vision</h2>
        <div style="margin: 8px 0; display:flex; gap:12px; align-items:center;">
            <button id="btn-start" style="padding:6px 12px;">Start</button>
            <button id="btn-stop" style="padding:6px 12px;">Stop</button>
            <span id="status" style="font-family:monospace; font-size:12px; color:#777">idle</span>
        </div>
        <video id="camera" autoplay playsinline muted style="display:none"></video>
        <canvas id="preview" width="1280" height="720" style="border:1px solid #444"></canvas>
        <script src="/client.js"></script>
    </main>
</body>
</html>"#;

// Camera capture, overlay drawing and periodic submission.
const CLIENT_JS: &str = r#"(function(){
    const DETECT_MS = 500, LOG_MS = 5000;
    const status = (t)=>{ const el=document.getElementById('status'); if(el) el.textContent=t; };
    const video = document.getElementById('camera');
    const canvas = document.getElementById('preview');
    const ctx = canvas.getContext('2d');
    let points = [], snapshot = null, timers = [], busy = false;

    const draw = ()=>{
        ctx.drawImage(video, 0, 0, canvas.width, canvas.height);
        ctx.lineWidth = 2;
        ctx.fillStyle = '#ffdc00';
        for(const p of points){ ctx.beginPath(); ctx.arc(p.x, p.y, 4, 0, 2*Math.PI); ctx.fill(); }
        if(!snapshot) return;
        ctx.strokeStyle = '#00ff00';
        for(const c of snapshot.checkers){ ctx.beginPath(); ctx.arc(c.x, c.y, Math.max(c.radius,1), 0, 2*Math.PI); ctx.stroke(); }
        const box = (d, color)=>{ if(!d) return; ctx.strokeStyle=color; ctx.strokeRect(d.x-d.radius, d.y-d.radius, 2*d.radius, 2*d.radius); };
        box(snapshot.dice.red, '#ff0000');
        box(snapshot.dice.white, '#ffffff');
        if(snapshot.cube && snapshot.cube.x!=null && snapshot.cube.y!=null){ box({x:snapshot.cube.x, y:snapshot.cube.y, radius:20}, '#0080ff'); }
    };

    const detect = ()=>{
        if(busy) return;
        busy = true;
        draw();
        canvas.toBlob((blob)=>{
            fetch('/api/detect', { method:'POST', body: blob })
                .then(r=>r.ok ? r.json() : Promise.reject(r.status))
                .then(s=>{ snapshot = s; draw(); status('tracking'); })
                .catch(e=>status('detect failed: '+e))
                .finally(()=>{ busy = false; });
        }, 'image/jpeg', 0.85);
    };

    const submit = ()=>{
        if(!snapshot) return;
        fetch('/api/log', { method:'POST', headers:{'Content-Type':'application/json'},
            body: JSON.stringify({ gameState: snapshot, timestamp: new Date().toISOString() }) })
            .then(r=>r.json())
            .then(res=>status(res.success ? 'logged '+res.timestamp : 'log failed: '+res.error))
            .catch(e=>status('log failed: '+e));
    };

    const start = async ()=>{
        try{
            video.srcObject = await navigator.mediaDevices.getUserMedia({ video: { width: 1280, height: 720 } });
        }catch(e){ status('camera unavailable: '+e); return; }
        const r = await fetch('/api/regions?width='+canvas.width+'&height='+canvas.height);
        if(r.ok) points = await r.json();
        timers.push(setInterval(detect, DETECT_MS), setInterval(submit, LOG_MS));
        status('started');
    };
    const stop = ()=>{
        timers.forEach(clearInterval); timers = [];
        if(video.srcObject){ video.srcObject.getTracks().forEach(t=>t.stop()); video.srcObject = null; }
        status('stopped');
    };
    document.getElementById('btn-start').onclick = start;
    document.getElementById('btn-stop').onclick = stop;
})();"#;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Html(INDEX_HTML) }))
        .route("/client.js", get(|| async {
            let mut resp = Response::new(axum::body::Body::from(CLIENT_JS));
            resp.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static("application/javascript"));
            resp
        }))
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/regions", get(regions))
        .route("/api/log", post(log_game_state))
        .route(
            "/api/detect",
            post(detect_frame).layer(DefaultBodyLimit::max(DETECT_BODY_LIMIT)),
        )
        .with_state(state)
}

pub async fn start_server(cfg: ServerConfig) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let app = router(AppState::new(&cfg));
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(
        addr = %cfg.bind_addr,
        log = %cfg.log_path.display(),
        lock_timeout = ?cfg.lock_timeout,
        "gammon vision server listening"
    );

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "server stopped");
        }
    });
    Ok(server)
}
