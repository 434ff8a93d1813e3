//! Single binary web server: JSON API over the tournament engine.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default.
//! Override with env: HOST (e.g. 0.0.0.0), PORT (e.g. 8080).

use actix_web::{
    delete, get, post, put,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use chrono::NaiveDateTime;
use field_tournament_web::{
    all_standings, cancel_correction, check_reassignment, commit_correction, compute_standings,
    draw_groups, import_teams_csv, publish, reassign_resource, record_score, remove_team,
    reschedule_unplayed, resolve_placeholder, restore_team, set_manual_tiebreak, start_correction,
    start_match, swap_matches,
    CorrectionSession, MatchId, Placeholder, ResourceChange, TeamId, Tournament, TournamentConfig,
    TournamentError, TournamentId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Per-tournament entry: tournament data + last activity time (for auto-cleanup).
struct TournamentEntry {
    tournament: Tournament,
    last_activity: Instant,
}

/// In-memory state: many tournaments by ID. Entries are removed after inactivity.
type AppState = Data<RwLock<HashMap<TournamentId, TournamentEntry>>>;

/// Inactivity threshold: tournaments not accessed for this long are removed.
const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(24 * 3600);

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct CreateTournamentBody {
    name: String,
    #[serde(default)]
    config: TournamentConfig,
}

#[derive(Deserialize)]
struct AddTeamBody {
    name: String,
    #[serde(default)]
    group: Option<String>,
}

#[derive(Deserialize)]
struct UpdateTeamBody {
    #[serde(default)]
    name: Option<String>,
    /// Present (even as null) to move the team.
    #[serde(default, with = "double_option")]
    group: Option<Option<String>>,
}

/// Distinguishes a missing `group` key from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}

#[derive(Deserialize)]
struct DrawBody {
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize)]
struct RescheduleBody {
    from: NaiveDateTime,
}

#[derive(Deserialize)]
struct ScoreBody {
    a: u32,
    b: u32,
}

#[derive(Deserialize)]
struct SwapBody {
    first: MatchId,
    second: MatchId,
}

#[derive(Deserialize)]
struct CommitCorrectionBody {
    session: CorrectionSession,
    a: u32,
    b: u32,
}

#[derive(Deserialize)]
struct CancelCorrectionBody {
    session: CorrectionSession,
}

#[derive(Deserialize)]
struct TiebreakBody {
    #[serde(default)]
    group: Option<String>,
    order: Vec<TeamId>,
}

#[derive(Serialize)]
struct GroupStandings {
    group: Option<String>,
    standings: Vec<field_tournament_web::Standing>,
}

/// Path segment: tournament id (e.g. /api/tournaments/{id})
#[derive(Deserialize)]
struct TournamentPath {
    id: TournamentId,
}

/// Path segments: tournament id and team id
#[derive(Deserialize)]
struct TournamentTeamPath {
    id: TournamentId,
    team_id: TeamId,
}

/// Path segments: tournament id and match id
#[derive(Deserialize)]
struct TournamentMatchPath {
    id: TournamentId,
    match_id: MatchId,
}

#[derive(Deserialize)]
struct TournamentGroupPath {
    id: TournamentId,
    group: String,
}

#[derive(Deserialize)]
struct TournamentPlaceholderPath {
    id: TournamentId,
    placeholder: String,
}

/// Conflicts → 409, missing entities → 404, everything else → 400.
fn error_response(e: &TournamentError) -> HttpResponse {
    let body = match e {
        TournamentError::Conflict(report) => serde_json::json!({ "error": e.to_string(), "conflict": report }),
        TournamentError::UnresolvedTie { placeholder, teams } => {
            serde_json::json!({ "error": e.to_string(), "placeholder": placeholder, "teams": teams })
        }
        _ => serde_json::json!({ "error": e.to_string() }),
    };
    match e {
        TournamentError::Conflict(_) => HttpResponse::Conflict().json(body),
        TournamentError::MatchNotFound(_) | TournamentError::TeamNotFound(_) | TournamentError::GroupNotFound(_) => {
            HttpResponse::NotFound().json(body)
        }
        _ => HttpResponse::BadRequest().json(body),
    }
}

/// Run `op` on one tournament under the write lock and return its result as JSON.
/// Touching a tournament refreshes last_activity.
fn with_tournament<T: Serialize>(
    state: &AppState,
    id: TournamentId,
    op: impl FnOnce(&mut Tournament) -> Result<T, TournamentError>,
) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    let entry = match g.get_mut(&id) {
        Some(e) => e,
        None => return HttpResponse::NotFound().json(serde_json::json!({ "error": "No tournament" })),
    };
    entry.last_activity = Instant::now();
    match op(&mut entry.tournament) {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => {
            log::debug!("Request on tournament {} failed: {}", id, e);
            error_response(&e)
        }
    }
}

/// Like `with_tournament`, returning the whole tournament after a successful change.
fn mutate(
    state: &AppState,
    id: TournamentId,
    op: impl FnOnce(&mut Tournament) -> Result<(), TournamentError>,
) -> HttpResponse {
    with_tournament(state, id, |t| {
        op(t)?;
        Ok(t.clone())
    })
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "field-tournament-web",
    })
}

/// Create a new tournament in Draft state (returns it with id).
#[post("/api/tournaments")]
async fn api_create_tournament(state: AppState, body: Json<CreateTournamentBody>) -> HttpResponse {
    let body = body.into_inner();
    if let Err(e) = body.config.validate() {
        return error_response(&e);
    }
    let tournament = Tournament::new(body.name.trim(), body.config);
    let id = tournament.id;
    let response = HttpResponse::Ok().json(&tournament);
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    g.insert(
        id,
        TournamentEntry {
            tournament,
            last_activity: Instant::now(),
        },
    );
    log::info!("Created tournament {}", id);
    response
}

/// Get a tournament by id (404 if not found).
#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    with_tournament(&state, path.id, |t| Ok(t.clone()))
}

/// Replace the configuration (Draft only).
#[put("/api/tournaments/{id}/config")]
async fn api_set_config(state: AppState, path: Path<TournamentPath>, body: Json<TournamentConfig>) -> HttpResponse {
    mutate(&state, path.id, |t| t.set_config(body.into_inner()))
}

/// Add a team (Draft only).
#[post("/api/tournaments/{id}/teams")]
async fn api_add_team(state: AppState, path: Path<TournamentPath>, body: Json<AddTeamBody>) -> HttpResponse {
    let body = body.into_inner();
    mutate(&state, path.id, |t| t.add_team(body.name, body.group).map(|_| ()))
}

/// Import teams from CSV text (`name[,group]` per line).
#[post("/api/tournaments/{id}/teams/import")]
async fn api_import_teams(state: AppState, path: Path<TournamentPath>, body: String) -> HttpResponse {
    with_tournament(&state, path.id, |t| {
        let imported = import_teams_csv(t, body.as_bytes())?;
        Ok(serde_json::json!({ "imported": imported, "tournament": t }))
    })
}

/// Rename a team and/or move it to another group.
#[put("/api/tournaments/{id}/teams/{team_id}")]
async fn api_update_team(state: AppState, path: Path<TournamentTeamPath>, body: Json<UpdateTeamBody>) -> HttpResponse {
    let body = body.into_inner();
    mutate(&state, path.id, |t| {
        if let Some(group) = &body.group {
            t.set_team_group(path.team_id, group.as_deref())?;
        }
        if let Some(name) = &body.name {
            t.rename_team(path.team_id, name)?;
        }
        Ok(())
    })
}

/// Remove a team (hard delete in Draft, marked removed once published). Returns the placement report.
#[delete("/api/tournaments/{id}/teams/{team_id}")]
async fn api_remove_team(state: AppState, path: Path<TournamentTeamPath>) -> HttpResponse {
    with_tournament(&state, path.id, |t| remove_team(t, path.team_id))
}

#[post("/api/tournaments/{id}/teams/{team_id}/restore")]
async fn api_restore_team(state: AppState, path: Path<TournamentTeamPath>) -> HttpResponse {
    with_tournament(&state, path.id, |t| restore_team(t, path.team_id))
}

/// Shuffle active teams into the configured groups. Random seed unless one is given.
#[post("/api/tournaments/{id}/draw")]
async fn api_draw_groups(state: AppState, path: Path<TournamentPath>, body: Option<Json<DrawBody>>) -> HttpResponse {
    let seed = body.and_then(|b| b.seed).unwrap_or_else(rand::random);
    mutate(&state, path.id, |t| draw_groups(t, seed))
}

/// Generate the schedule and publish (Draft → Published).
#[post("/api/tournaments/{id}/publish")]
async fn api_publish(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    mutate(&state, path.id, publish)
}

/// Re-time all unplayed matches from a new start.
#[post("/api/tournaments/{id}/reschedule")]
async fn api_reschedule(state: AppState, path: Path<TournamentPath>, body: Json<RescheduleBody>) -> HttpResponse {
    mutate(&state, path.id, |t| reschedule_unplayed(t, body.from))
}

#[post("/api/tournaments/{id}/matches/{match_id}/start")]
async fn api_start_match(state: AppState, path: Path<TournamentMatchPath>) -> HttpResponse {
    mutate(&state, path.id, |t| start_match(t, path.match_id))
}

/// Record a final score; returns the group table and placement changes.
#[put("/api/tournaments/{id}/matches/{match_id}/score")]
async fn api_record_score(state: AppState, path: Path<TournamentMatchPath>, body: Json<ScoreBody>) -> HttpResponse {
    with_tournament(&state, path.id, |t| record_score(t, path.match_id, body.a, body.b))
}

/// Dry-run a field/referee change; `conflict` is null when the change is free.
#[post("/api/tournaments/{id}/matches/{match_id}/conflicts")]
async fn api_check_conflict(state: AppState, path: Path<TournamentMatchPath>, body: Json<ResourceChange>) -> HttpResponse {
    with_tournament(&state, path.id, |t| {
        let conflict = check_reassignment(t, path.match_id, body.into_inner())?;
        Ok(serde_json::json!({ "conflict": conflict }))
    })
}

#[put("/api/tournaments/{id}/matches/{match_id}/resources")]
async fn api_reassign(state: AppState, path: Path<TournamentMatchPath>, body: Json<ResourceChange>) -> HttpResponse {
    mutate(&state, path.id, |t| reassign_resource(t, path.match_id, body.into_inner()))
}

#[post("/api/tournaments/{id}/matches/swap")]
async fn api_swap(state: AppState, path: Path<TournamentPath>, body: Json<SwapBody>) -> HttpResponse {
    mutate(&state, path.id, |t| swap_matches(t, body.first, body.second))
}

/// Open a correction; the returned session is needed to commit or cancel.
#[post("/api/tournaments/{id}/matches/{match_id}/correction")]
async fn api_start_correction(state: AppState, path: Path<TournamentMatchPath>) -> HttpResponse {
    with_tournament(&state, path.id, |t| start_correction(t, path.match_id))
}

#[put("/api/tournaments/{id}/correction")]
async fn api_commit_correction(state: AppState, path: Path<TournamentPath>, body: Json<CommitCorrectionBody>) -> HttpResponse {
    with_tournament(&state, path.id, |t| commit_correction(t, &body.session, body.a, body.b))
}

#[post("/api/tournaments/{id}/correction/cancel")]
async fn api_cancel_correction(state: AppState, path: Path<TournamentPath>, body: Json<CancelCorrectionBody>) -> HttpResponse {
    mutate(&state, path.id, |t| cancel_correction(t, &body.session))
}

/// Standings of every group.
#[get("/api/tournaments/{id}/standings")]
async fn api_all_standings(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    with_tournament(&state, path.id, |t| {
        Ok(all_standings(t)
            .into_iter()
            .map(|(group, standings)| GroupStandings { group, standings })
            .collect::<Vec<_>>())
    })
}

#[get("/api/tournaments/{id}/standings/{group}")]
async fn api_group_standings(state: AppState, path: Path<TournamentGroupPath>) -> HttpResponse {
    with_tournament(&state, path.id, |t| compute_standings(t, Some(&path.group)))
}

/// Organizer order for teams no criterion separates. Returns the placement report.
#[put("/api/tournaments/{id}/tiebreaks")]
async fn api_set_tiebreak(state: AppState, path: Path<TournamentPath>, body: Json<TiebreakBody>) -> HttpResponse {
    let body = body.into_inner();
    with_tournament(&state, path.id, |t| set_manual_tiebreak(t, body.group.as_deref(), body.order))
}

/// Current team behind a placeholder such as `group-a-1st` or `semi1-winner` (null if not known yet).
#[get("/api/tournaments/{id}/placeholders/{placeholder}")]
async fn api_resolve_placeholder(state: AppState, path: Path<TournamentPlaceholderPath>) -> HttpResponse {
    let placeholder: Placeholder = match path.placeholder.parse() {
        Ok(p) => p,
        Err(e) => return HttpResponse::BadRequest().json(serde_json::json!({ "error": e })),
    };
    with_tournament(&state, path.id, |t| {
        let team = resolve_placeholder(t, &placeholder)?;
        Ok(serde_json::json!({ "placeholder": placeholder, "team": team }))
    })
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = std::env::var("HOST").unwrap_or_else(|_| default_host());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or_else(default_port);
    let bind = (host.as_str(), port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    let state = Data::new(RwLock::new(HashMap::<TournamentId, TournamentEntry>::new()));

    // Background task: every 30 minutes, remove tournaments inactive for 24+ hours
    let state_cleanup = state.clone();
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(Duration::from_secs(30 * 60));
        loop {
            interval.tick().await;
            let mut g = match state_cleanup.write() {
                Ok(guard) => guard,
                Err(_) => continue,
            };
            let before = g.len();
            g.retain(|_, entry| entry.last_activity.elapsed() < INACTIVITY_TIMEOUT);
            let removed = before - g.len();
            if removed > 0 {
                log::info!("Cleaned up {} inactive tournament(s)", removed);
            }
        }
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(api_create_tournament)
            .service(api_get_tournament)
            .service(api_set_config)
            .service(api_add_team)
            .service(api_import_teams)
            .service(api_update_team)
            .service(api_remove_team)
            .service(api_restore_team)
            .service(api_draw_groups)
            .service(api_publish)
            .service(api_reschedule)
            .service(api_swap)
            .service(api_start_match)
            .service(api_record_score)
            .service(api_check_conflict)
            .service(api_reassign)
            .service(api_start_correction)
            .service(api_commit_correction)
            .service(api_cancel_correction)
            .service(api_all_standings)
            .service(api_group_standings)
            .service(api_set_tiebreak)
            .service(api_resolve_placeholder)
    })
    .bind(bind)?
    .run()
    .await
}
