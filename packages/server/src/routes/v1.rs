use axum::middleware::from_fn_with_state;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::rate_limit::{limit_api, limit_auth};
use crate::state::AppState;

pub fn routes(state: &AppState) -> OpenApiRouter<AppState> {
    let api = OpenApiRouter::new()
        .nest("/auth", session_routes())
        .nest("/jobs", job_routes(state))
        .nest("/summaries", summary_routes())
        .merge(account_routes())
        .layer(from_fn_with_state(state.clone(), limit_api));

    OpenApiRouter::new()
        .nest("/auth", credential_routes(state))
        .merge(api)
}

/// Register and login, limited as the `auth` class.
fn credential_routes(state: &AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .layer(from_fn_with_state(state.clone(), limit_auth))
}

fn session_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::logout))
        .routes(routes!(handlers::auth::me))
}

fn job_routes(state: &AppState) -> OpenApiRouter<AppState> {
    let summarizer = &state.config.summarizer;

    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::job::upload_job))
        .layer(handlers::job::upload_body_limit(summarizer));
    let batch = OpenApiRouter::new()
        .routes(routes!(handlers::job::batch_jobs))
        .layer(handlers::job::batch_body_limit(summarizer));

    OpenApiRouter::new()
        .routes(routes!(handlers::job::create_job, handlers::job::list_jobs))
        .routes(routes!(handlers::job::get_job))
        .merge(upload)
        .merge(batch)
}

fn summary_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::summary::list_summaries))
        .routes(routes!(handlers::summary::export_summaries))
        .routes(routes!(handlers::summary::import_summaries))
        .routes(routes!(handlers::summary::synthesize))
        .routes(routes!(handlers::summary::export_synthesis))
        .routes(routes!(
            handlers::summary::get_summary,
            handlers::summary::update_summary,
            handlers::summary::delete_summary
        ))
        .routes(routes!(handlers::summary::export_summary))
        .routes(routes!(
            handlers::evidence::list_evidence,
            handlers::evidence::create_evidence
        ))
        .routes(routes!(
            handlers::evidence::update_evidence,
            handlers::evidence::delete_evidence
        ))
        .routes(routes!(handlers::evidence::generate_evidence))
}

fn account_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::account::get_settings,
            handlers::account::put_settings
        ))
        .routes(routes!(handlers::account::get_storage))
        .routes(routes!(handlers::account::get_analytics))
        .routes(routes!(handlers::account::clear_data))
        .routes(routes!(handlers::account::list_models))
}
