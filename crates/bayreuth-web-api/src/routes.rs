
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json,
    Router,
};

use bayreuth_meal_api::{extract, feed, Canteen, Source, WebSource};
use chrono::Local;

use crate::config::Config;

use self::data::{MenuCache, RefreshHandle};

mod data;
mod helpers;
use helpers::*;

/// Builds the cache from the config, starts refreshing it and returns
/// the router serving it.
pub async fn make_router(config: &Config) -> anyhow::Result<(Router, RefreshHandle)> {
    let source = WebSource::new(
        &config.source.base_url,
        config.source.timeout(),
        &config.source.user_agent,
    )?;

    let cache = MenuCache::new(source, config.refresh.weekly_min_hour);
    let refresh = cache.start(&config.refresh.schedule).await?;

    Ok((router(cache), refresh))
}

fn router<S: Source>(cache: MenuCache<S>) -> Router {
    Router::new()
        .route("/mensa/:mensa", get(feed_weeks::<S>))
        .route("/mensa/:mensa/today", get(feed_today::<S>))
        .route("/mensa/:mensa/week", get(feed_this_week::<S>))
        .with_state(cache)
}

#[derive(Default, Debug, Clone, Copy, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
enum FeedFormat {
    #[default] Xml,
    Json,
}

#[derive(Debug, serde::Deserialize)]
struct FeedQuery {
    #[serde(default)]
    format: FeedFormat,
}

fn render(canteen: Canteen, format: FeedFormat) -> Result<Response, ApiError> {
    Ok(match format {
        FeedFormat::Xml => {
            let xml = feed::to_xml(&canteen).map_err(server_error)?;
            ([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], xml).into_response()
        },
        FeedFormat::Json => Json(canteen).into_response(),
    })
}

/// today and the next two weeks
async fn feed_weeks<S: Source>(
    Path(mensa): Path<String>,
    Query(q): Query<FeedQuery>,
    State(cache): State<MenuCache<S>>,
) -> Result<Response, ApiError> {
    let mensa = parse_mensa(&mensa)?;
    let weeks = cache.current_weeks(mensa);

    let canteen = extract::canteen_weeks(weeks.iter().map(|v| v.as_ref()))
        .map_err(server_error)?;
    render(canteen, q.format)
}

async fn feed_this_week<S: Source>(
    Path(mensa): Path<String>,
    Query(q): Query<FeedQuery>,
    State(cache): State<MenuCache<S>>,
) -> Result<Response, ApiError> {
    let mensa = parse_mensa(&mensa)?;
    let week = cache.current_week(mensa, 0);

    let canteen = extract::canteen_weeks(week.as_deref())
        .map_err(server_error)?;
    render(canteen, q.format)
}

async fn feed_today<S: Source>(
    Path(mensa): Path<String>,
    Query(q): Query<FeedQuery>,
    State(cache): State<MenuCache<S>>,
) -> Result<Response, ApiError> {
    let mensa = parse_mensa(&mensa)?;
    let snapshot = cache.current_today(mensa);

    let canteen = extract::canteen_today(&snapshot, Local::now().date_naive())
        .map_err(server_error)?;
    render(canteen, q.format)
}
